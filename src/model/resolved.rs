//! Resolved model: catalog validated and flattened for runtime use.

use crate::error::ModelError;
use crate::model::{validate, Catalog, ColumnType, ForeignKey, TableCheck, ValidationRule};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// SQL default expression, if any.
    pub default: Option<String>,
    pub references: Option<ForeignKey>,
    /// Managed by the database (`id`, `created_at`, `updated_at`); ignored in request bodies.
    pub read_only: bool,
}

impl ColumnInfo {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_pk(&self) -> bool {
        self.column_type == ColumnType::Serial
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: Option<String>,
    pub pk_column: String,
    /// `id` first, then declared columns, then `created_at` / `updated_at`.
    pub columns: Vec<ColumnInfo>,
    /// Column names stripped from all API responses.
    pub sensitive_columns: HashSet<String>,
    pub unique: Vec<Vec<String>>,
    pub checks: Vec<TableCheck>,
    pub validation: HashMap<String, ValidationRule>,
    pub admin_writes: bool,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.column(name).map(|c| !c.read_only).unwrap_or(false)
    }

    /// Label used in error messages and logs, e.g. "health-records".
    pub fn label(&self) -> &str {
        self.path_segment.as_deref().unwrap_or(&self.table_name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    /// In dependency order: referenced tables come first.
    pub entities: Vec<Arc<ResolvedEntity>>,
    by_table: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn entity(&self, table: &str) -> Option<&Arc<ResolvedEntity>> {
        self.by_table.get(table).map(|&i| &self.entities[i])
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&Arc<ResolvedEntity>> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    /// Entities served by the generic CRUD router.
    pub fn routed(&self) -> impl Iterator<Item = &Arc<ResolvedEntity>> {
        self.entities.iter().filter(|e| e.path_segment.is_some())
    }
}

/// Build the resolved model for `schema` (validates the catalog first).
pub fn resolve(catalog: &Catalog, schema: &str) -> Result<ResolvedModel, ModelError> {
    validate(catalog)?;

    let mut entities = Vec::with_capacity(catalog.tables.len());
    let mut by_table = HashMap::new();
    let mut by_path = HashMap::new();

    for t in &catalog.tables {
        let mut columns = vec![ColumnInfo {
            name: "id".into(),
            column_type: ColumnType::Serial,
            nullable: false,
            unique: false,
            default: None,
            references: None,
            read_only: true,
        }];
        let mut validation = HashMap::new();
        let mut sensitive_columns = HashSet::new();

        for c in &t.columns {
            let mut rule = c.rule.clone();
            if !c.nullable && c.default.is_none() {
                rule.required = Some(true);
            }
            if !rule.is_empty() {
                validation.insert(c.name.to_string(), rule);
            }
            if c.sensitive {
                sensitive_columns.insert(c.name.to_string());
            }
            columns.push(ColumnInfo {
                name: c.name.to_string(),
                column_type: c.column_type,
                nullable: c.nullable,
                unique: c.unique,
                default: c.default.map(str::to_string),
                references: c.references.clone(),
                read_only: false,
            });
        }

        for name in ["created_at", "updated_at"] {
            columns.push(ColumnInfo {
                name: name.into(),
                column_type: ColumnType::Timestamptz,
                nullable: false,
                unique: false,
                default: Some("NOW()".into()),
                references: None,
                read_only: true,
            });
        }

        let idx = entities.len();
        by_table.insert(t.name.to_string(), idx);
        if let Some(seg) = t.path_segment {
            by_path.insert(seg.to_string(), idx);
        }
        entities.push(Arc::new(ResolvedEntity {
            schema_name: schema.to_string(),
            table_name: t.name.to_string(),
            path_segment: t.path_segment.map(str::to_string),
            pk_column: "id".into(),
            columns,
            sensitive_columns,
            unique: t.unique.iter().map(|g| g.iter().map(|c| c.to_string()).collect()).collect(),
            checks: t.checks.clone(),
            validation,
            admin_writes: t.admin_writes,
        }));
    }

    Ok(ResolvedModel {
        entities,
        by_table,
        by_path,
    })
}
