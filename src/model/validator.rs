//! Catalog validation: unique names and referential integrity between table definitions.

use crate::error::ModelError;
use crate::model::Catalog;
use std::collections::{HashMap, HashSet};

/// Columns every table gets in addition to its declared ones.
pub const IMPLICIT_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

pub fn validate(catalog: &Catalog) -> Result<(), ModelError> {
    let mut seen_tables: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut path_segments = HashSet::new();

    for t in &catalog.tables {
        if seen_tables.contains_key(t.name) {
            return Err(ModelError::DuplicateTable(t.name.to_string()));
        }
        if let Some(seg) = t.path_segment {
            if !path_segments.insert(seg) {
                return Err(ModelError::DuplicatePathSegment(seg.to_string()));
            }
        }
        let mut columns: HashSet<&str> = IMPLICIT_COLUMNS.iter().copied().collect();
        for c in &t.columns {
            if !columns.insert(c.name) {
                return Err(ModelError::DuplicateColumn {
                    table: t.name.to_string(),
                    column: c.name.to_string(),
                });
            }
            if let Some(fk) = &c.references {
                let target_ok = seen_tables
                    .get(fk.table)
                    .map(|cols| cols.contains(fk.column))
                    .unwrap_or(false);
                if !target_ok {
                    return Err(ModelError::MissingReference {
                        table: t.name.to_string(),
                        column: c.name.to_string(),
                        target: format!("{}.{}", fk.table, fk.column),
                    });
                }
            }
            if let Some(pattern) = &c.rule.pattern {
                if regex::Regex::new(pattern).is_err() {
                    return Err(ModelError::InvalidPattern {
                        table: t.name.to_string(),
                        column: c.name.to_string(),
                        pattern: pattern.clone(),
                    });
                }
            }
        }
        for group in &t.unique {
            if let Some(missing) = group.iter().find(|c| !columns.contains(*c)) {
                return Err(ModelError::MissingReference {
                    table: t.name.to_string(),
                    column: missing.to_string(),
                    target: "unique constraint".into(),
                });
            }
        }
        seen_tables.insert(t.name, columns);
    }

    Ok(())
}
