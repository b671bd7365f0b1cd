//! Table creation on startup: DDL for the resolved model.
//! Every statement is IF NOT EXISTS, so running it against an initialized database is a no-op.

use crate::error::AppError;
use crate::model::{ResolvedEntity, ResolvedModel};
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;

/// CREATE TABLE IF NOT EXISTS with column, primary key, unique, check and foreign key constraints.
pub fn create_table_sql(entity: &ResolvedEntity) -> String {
    let mut defs: Vec<String> = Vec::new();
    for c in &entity.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.column_type.ddl());
        if c.is_pk() {
            def.push_str(" PRIMARY KEY");
        } else {
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if c.unique {
                def.push_str(" UNIQUE");
            }
            if let Some(d) = &c.default {
                def.push_str(" DEFAULT ");
                def.push_str(d);
            }
        }
        defs.push(def);
    }
    for group in &entity.unique {
        let cols: Vec<String> = group.iter().map(|s| quoted(s)).collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }
    for ch in &entity.checks {
        defs.push(format!("CONSTRAINT {} CHECK ({})", quoted(ch.name), ch.expression));
    }
    for c in &entity.columns {
        let Some(fk) = &c.references else { continue };
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}.{} ({}) ON DELETE {}",
            quoted(&c.name),
            quoted(&entity.schema_name),
            quoted(fk.table),
            quoted(fk.column),
            fk.on_delete.sql()
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(entity),
        defs.join(",\n  ")
    )
}

/// CREATE INDEX IF NOT EXISTS for foreign key columns (unique ones are already indexed).
pub fn create_index_sql(entity: &ResolvedEntity) -> Vec<String> {
    entity
        .columns
        .iter()
        .filter(|c| c.references.is_some() && !c.unique)
        .map(|c| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("idx_{}_{}", entity.table_name, c.name)),
                qualified_table(entity),
                quoted(&c.name)
            )
        })
        .collect()
}

/// Create the schema, tables (in dependency order) and indexes if they do not exist.
pub async fn create_all(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let mut schemas: Vec<&str> = model.entities.iter().map(|e| e.schema_name.as_str()).collect();
    schemas.dedup();
    for schema in schemas {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
            .execute(pool)
            .await?;
    }

    for entity in &model.entities {
        let sql = create_table_sql(entity);
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
        for idx in create_index_sql(entity) {
            sqlx::query(&idx).execute(pool).await?;
        }
    }
    Ok(())
}

/// Startup hook: create tables, logging failure instead of propagating it so the server still starts.
pub async fn on_startup(pool: &PgPool, model: &ResolvedModel) {
    tracing::info!(tables = model.entities.len(), "creating tables if not exist");
    match create_all(pool, model).await {
        Ok(()) => tracing::info!("tables verified/created"),
        Err(e) => tracing::error!(error = %e, "table creation failed"),
    }
}
