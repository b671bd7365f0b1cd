//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::model::ResolvedEntity;
use crate::sql::{delete, insert, select_by_id, select_list, update, PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// List rows with optional exact-match filters, limit (default 100, max 1000) and offset.
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_list(entity, filters, limit, offset);
        Self::fetch_all(pool, &q).await
    }

    pub async fn read(pool: &PgPool, entity: &ResolvedEntity, id: i64) -> Result<Option<Value>, AppError> {
        let q = select_by_id(entity, id);
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row. Returns the created row. Accepts a pool or a transaction.
    pub async fn create<'c, E>(
        executor: E,
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError>
    where
        E: PgExecutor<'c>,
    {
        let q = insert(entity, body);
        let row = Self::fetch_optional(executor, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tracing::info!(table = %entity.table_name, id = ?row.get("id"), "row created");
        Ok(row)
    }

    /// Update one row by id. Returns the updated row, or None when no row has that id.
    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: i64,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = update(entity, id, body);
        Self::fetch_optional(pool, &q).await
    }

    /// Delete one row by id. Returns whether a row was deleted.
    pub async fn delete(pool: &PgPool, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = delete(entity, id);
        let deleted = Self::fetch_optional(pool, &q).await?.is_some();
        if deleted {
            tracing::info!(table = %entity.table_name, id, "row deleted");
        }
        Ok(deleted)
    }

    /// Run a hand-written query and return rows as JSON objects without `entity`'s sensitive columns.
    pub async fn query_rows(
        pool: &PgPool,
        entity: &ResolvedEntity,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Value>, AppError> {
        let q = QueryBuf {
            sql: sql.to_string(),
            params: params.to_vec(),
        };
        let mut rows = Self::fetch_all(pool, &q).await?;
        for row in &mut rows {
            if let Value::Object(map) = row {
                map.retain(|k, _| !entity.sensitive_columns.contains(k));
            }
        }
        Ok(rows)
    }

    async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = q.params.len(), "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional<'c, E>(executor: E, q: &QueryBuf) -> Result<Option<Value>, AppError>
    where
        E: PgExecutor<'c>,
    {
        tracing::debug!(sql = %q.sql, params = q.params.len(), "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(executor).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

pub fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
        return v
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(name) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}
