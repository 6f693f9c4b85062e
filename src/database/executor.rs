//! Schema-qualified query execution for tenant data.
//!
//! Every statement names its target schema explicitly; nothing in the
//! request path relies on `search_path`. This is the seam business-domain
//! repositories build on.

use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, Column, PgPool, Row};
use std::time::Instant;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};

pub struct SchemaExecutor {
    pool: PgPool,
}

impl SchemaExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read rows from a table inside a tenant schema, returning raw JSON maps.
    pub async fn fetch_table(
        &self,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        if !DatabaseManager::is_valid_schema_name(schema) {
            return Err(DatabaseError::InvalidIdentifier(schema.to_string()));
        }
        if !DatabaseManager::is_valid_table_name(table) {
            return Err(DatabaseError::InvalidIdentifier(table.to_string()));
        }

        let sql = format!(
            "SELECT * FROM {}.{} LIMIT $1 OFFSET $2",
            DatabaseManager::quote_identifier(schema),
            DatabaseManager::quote_identifier(table)
        );

        let started = Instant::now();
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("42P01") {
                        return DatabaseError::NotFound(format!(
                            "Table '{}' not found in schema '{}'",
                            table, schema
                        ));
                    }
                }
                DatabaseError::Sqlx(e)
            })?;
        let elapsed = started.elapsed();

        let db_config = &config::config().database;
        if db_config.enable_query_logging {
            tracing::debug!("Executed '{}' in {:?}", sql, elapsed);
        }
        if db_config.enable_slow_query_warning
            && elapsed.as_millis() as u64 > db_config.slow_query_threshold_ms
        {
            tracing::warn!("Slow query ({} ms): {}", elapsed.as_millis(), sql);
        }

        Ok(rows.iter().map(row_to_map).collect())
    }
}

/// Convert a row to a JSON map without knowing the table's shape up front.
fn row_to_map(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();

    for i in 0..row.len() {
        let column_name = row.column(i).name();
        let value: Result<Option<Value>, _> = row.try_get(i);

        let json_value = match value {
            Ok(Some(v)) => v,
            Ok(None) => Value::Null,
            Err(_) => {
                // Try concrete types when direct JSON extraction fails
                if let Ok(s) = row.try_get::<String, _>(i) {
                    Value::String(s)
                } else if let Ok(i64_val) = row.try_get::<i64, _>(i) {
                    Value::Number(i64_val.into())
                } else if let Ok(f64_val) = row.try_get::<f64, _>(i) {
                    Value::Number(
                        serde_json::Number::from_f64(f64_val).unwrap_or_else(|| 0.into()),
                    )
                } else if let Ok(bool_val) = row.try_get::<bool, _>(i) {
                    Value::Bool(bool_val)
                } else if let Ok(uuid_val) = row.try_get::<uuid::Uuid, _>(i) {
                    Value::String(uuid_val.to_string())
                } else if let Ok(ts_val) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(i) {
                    Value::String(ts_val.to_rfc3339())
                } else {
                    Value::Null
                }
            }
        };

        map.insert(column_name.to_string(), json_value);
    }

    map
}
