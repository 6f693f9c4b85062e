use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool manager for the shared platform database.
///
/// Tenant data lives in per-tenant schemas inside a single database, so one
/// pool serves every request and queries are schema-qualified by the
/// executor. The pool is built lazily: the binary starts, and the pure
/// middleware paths work, without a reachable database.
pub struct DatabaseManager {
    pool: Arc<RwLock<Option<PgPool>>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the shared platform database pool
    pub async fn platform_pool() -> Result<PgPool, DatabaseError> {
        Self::instance().get_pool().await
    }

    /// Get existing pool or create it lazily
    async fn get_pool(&self) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pool = self.pool.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let db_config = &config::config().database;

        let built = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connection_timeout))
            .connect_lazy(&url)?;

        // First writer wins if two callers raced past the read lock
        let mut slot = self.pool.write().await;
        let pool = slot
            .get_or_insert_with(|| {
                info!("Created platform database pool");
                built
            })
            .clone();

        Ok(pool)
    }

    /// Pings the platform pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::platform_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Quote SQL identifier to prevent injection
    pub(crate) fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Validate tenant schema names: "tenant_" followed by [a-z0-9_]+
    pub(crate) fn is_valid_schema_name(name: &str) -> bool {
        match name.strip_prefix("tenant_") {
            Some(rest) => {
                !rest.is_empty()
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            }
            None => false,
        }
    }

    /// Validate table identifiers supplied by callers: leading letter or
    /// underscore, then letters, digits and underscores
    pub(crate) fn is_valid_table_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close_all() {
        let manager = Self::instance();
        let mut slot = manager.pool.write().await;
        if let Some(pool) = slot.take() {
            pool.close().await;
            info!("Closed platform database pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_schema_names() {
        assert!(DatabaseManager::is_valid_schema_name(
            "tenant_a3b8c2d1_4e5f_4a6b_8c7d_9e0f1a2b3c4d"
        ));
        assert!(!DatabaseManager::is_valid_schema_name("tenant_"));
        assert!(!DatabaseManager::is_valid_schema_name("public"));
        assert!(!DatabaseManager::is_valid_schema_name("tenant_ABC"));
        assert!(!DatabaseManager::is_valid_schema_name("tenant_x; DROP SCHEMA"));
        assert!(!DatabaseManager::is_valid_schema_name("customer_a3b8"));
    }

    #[test]
    fn validates_table_names() {
        assert!(DatabaseManager::is_valid_table_name("tickets"));
        assert!(DatabaseManager::is_valid_table_name("_migrations"));
        assert!(DatabaseManager::is_valid_table_name("ticket_messages2"));
        assert!(!DatabaseManager::is_valid_table_name(""));
        assert!(!DatabaseManager::is_valid_table_name("2fast"));
        assert!(!DatabaseManager::is_valid_table_name("tickets; --"));
        assert!(!DatabaseManager::is_valid_table_name("tickets\"; DROP"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(DatabaseManager::quote_identifier("tickets"), "\"tickets\"");
        assert_eq!(
            DatabaseManager::quote_identifier("odd\"name"),
            "\"odd\"\"name\""
        );
    }
}
