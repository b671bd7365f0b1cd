//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::model::ResolvedEntity;
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from the catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// Push a value and return its placeholder with the column cast, e.g. `$2::date`.
    fn placeholder(&mut self, entity: &ResolvedEntity, column: &str, v: Value) -> String {
        let n = self.push_param(v);
        entity
            .column(column)
            .map(|c| format!("${}::{}", n, c.column_type.cast()))
            .unwrap_or_else(|| format!("${}", n))
    }
}

/// SELECT list without sensitive columns.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .filter(|c| !entity.sensitive_columns.contains(&c.name))
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(entity, &entity.pk_column, Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// SELECT list with optional filters (exact match per column), ORDER BY pk, LIMIT/OFFSET.
/// Filters on unknown or sensitive columns are dropped.
pub fn select_list(
    entity: &ResolvedEntity,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if entity.column(col).is_none() || entity.sensitive_columns.contains(col) {
            continue;
        }
        if val.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(col)));
            continue;
        }
        let ph = q.placeholder(entity, col, val.clone());
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = offset.unwrap_or(0);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        quoted(&entity.pk_column),
        limit,
        offset
    );
    q
}

/// INSERT: writable columns present in body; columns with a DB default are omitted when absent.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.columns.iter().filter(|c| !c.read_only) {
        let val = body.get(&c.name).cloned();
        if val.is_none() && c.has_default() {
            continue;
        }
        let ph = q.placeholder(entity, &c.name, val.unwrap_or(Value::Null));
        cols.push(quoted(&c.name));
        placeholders.push(ph);
    }
    let table = qualified_table(entity);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only writable columns present in body, and bump `updated_at`.
pub fn update(entity: &ResolvedEntity, id: i64, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    // Catalog column order, not body order.
    for c in entity.columns.iter().filter(|c| !c.read_only) {
        let Some(v) = body.get(&c.name) else { continue };
        let ph = q.placeholder(entity, &c.name, v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_ph = q.placeholder(entity, &entity.pk_column, Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted(&entity.pk_column),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(entity, &entity.pk_column, Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        quoted(&entity.pk_column),
        ph,
        quoted(&entity.pk_column)
    );
    q
}
