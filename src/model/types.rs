//! Declarative table and column definitions.

/// Column types used by the catalog. `Serial` is only used for primary keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    Integer,
    Text,
    Boolean,
    Date,
    Time,
    Timestamptz,
    Double,
}

impl ColumnType {
    /// Type as written in CREATE TABLE.
    pub fn ddl(&self) -> &'static str {
        match self {
            ColumnType::Serial => "SERIAL",
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamptz => "TIMESTAMPTZ",
            ColumnType::Double => "DOUBLE PRECISION",
        }
    }

    /// Type used in `$n::type` casts when binding parameters.
    pub fn cast(&self) -> &'static str {
        match self {
            ColumnType::Serial | ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamptz => "timestamptz",
            ColumnType::Double => "double precision",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: Option<bool>,
    pub format: Option<String>,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub pattern: Option<String>,
    pub allowed: Option<Vec<serde_json::Value>>,
    pub minimum: Option<f64>,
}

impl ValidationRule {
    pub fn is_empty(&self) -> bool {
        self.required.is_none()
            && self.format.is_none()
            && self.max_length.is_none()
            && self.min_length.is_none()
            && self.pattern.is_none()
            && self.allowed.is_none()
            && self.minimum.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// SQL default expression, e.g. `'staff'` or `NOW()`.
    pub default: Option<&'static str>,
    pub references: Option<ForeignKey>,
    /// Never returned in API responses.
    pub sensitive: bool,
    pub rule: ValidationRule,
}

impl ColumnDef {
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        ColumnDef {
            name,
            column_type,
            nullable: true,
            unique: false,
            default: None,
            references: None,
            sensitive: false,
            rule: ValidationRule::default(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    pub fn references(mut self, table: &'static str, on_delete: OnDelete) -> Self {
        self.references = Some(ForeignKey {
            table,
            column: "id",
            on_delete,
        });
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.rule.max_length = Some(n);
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.rule.min_length = Some(n);
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.rule.format = Some(format.to_string());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.rule.pattern = Some(pattern.to_string());
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.rule.allowed = Some(values.iter().map(|v| serde_json::Value::String(v.to_string())).collect());
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.rule.minimum = Some(n);
        self
    }
}

#[derive(Clone, Debug)]
pub struct TableCheck {
    pub name: &'static str,
    pub expression: &'static str,
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub name: &'static str,
    /// URL segment for the generic CRUD router. `None` for tables served by dedicated handlers.
    pub path_segment: Option<&'static str>,
    /// Columns besides `id`, `created_at` and `updated_at`, which every table gets.
    pub columns: Vec<ColumnDef>,
    pub unique: Vec<Vec<&'static str>>,
    pub checks: Vec<TableCheck>,
    /// Create/update/delete restricted to admins.
    pub admin_writes: bool,
}

impl TableDef {
    pub fn new(name: &'static str, path_segment: Option<&'static str>) -> Self {
        TableDef {
            name,
            path_segment,
            columns: Vec::new(),
            unique: Vec::new(),
            checks: Vec::new(),
            admin_writes: false,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn unique_together(mut self, columns: &[&'static str]) -> Self {
        self.unique.push(columns.to_vec());
        self
    }

    pub fn check(mut self, name: &'static str, expression: &'static str) -> Self {
        self.checks.push(TableCheck { name, expression });
        self
    }

    pub fn admin_writes(mut self) -> Self {
        self.admin_writes = true;
        self
    }
}

/// Ordered list of tables. Tables must appear after the tables they reference.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub tables: Vec<TableDef>,
}
