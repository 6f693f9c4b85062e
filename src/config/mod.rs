use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub isolation: IsolationConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Tenant isolation and audit settings.
///
/// `sensitive_tables` drives both the static source auditor and the runtime
/// query monitor. `platform_admin_role` and `platform_admin_path_prefix`
/// define the only combination allowed to operate without a tenant schema
/// context. `audit_allowlist` names path fragments of files that
/// legitimately reference the shared schema or issue platform-level queries
/// (migrations, the enforcement and audit layers themselves, the platform
/// pool and the isolation procedure); the static auditor skips them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationConfig {
    pub platform_admin_role: String,
    pub platform_admin_path_prefix: String,
    pub sensitive_tables: Vec<String>,
    pub audit_source_roots: Vec<String>,
    pub audit_allowlist: Vec<String>,
    pub min_expected_tables: usize,
    pub drift_severity: String,
    pub startup_audit: bool,
    pub query_check_interval_secs: u64,
    pub drift_check_interval_secs: u64,
    pub full_audit_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Isolation overrides
        if let Ok(v) = env::var("ISOLATION_PLATFORM_ADMIN_ROLE") {
            self.isolation.platform_admin_role = v;
        }
        if let Ok(v) = env::var("ISOLATION_PLATFORM_ADMIN_PATH_PREFIX") {
            self.isolation.platform_admin_path_prefix = v;
        }
        if let Ok(v) = env::var("ISOLATION_SENSITIVE_TABLES") {
            self.isolation.sensitive_tables =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("ISOLATION_AUDIT_SOURCE_ROOTS") {
            self.isolation.audit_source_roots =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("ISOLATION_AUDIT_ALLOWLIST") {
            self.isolation.audit_allowlist =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("ISOLATION_MIN_EXPECTED_TABLES") {
            self.isolation.min_expected_tables =
                v.parse().unwrap_or(self.isolation.min_expected_tables);
        }
        if let Ok(v) = env::var("ISOLATION_DRIFT_SEVERITY") {
            self.isolation.drift_severity = v;
        }
        if let Ok(v) = env::var("ISOLATION_STARTUP_AUDIT") {
            self.isolation.startup_audit = v.parse().unwrap_or(self.isolation.startup_audit);
        }
        if let Ok(v) = env::var("ISOLATION_QUERY_CHECK_INTERVAL_SECS") {
            self.isolation.query_check_interval_secs =
                v.parse().unwrap_or(self.isolation.query_check_interval_secs);
        }
        if let Ok(v) = env::var("ISOLATION_DRIFT_CHECK_INTERVAL_SECS") {
            self.isolation.drift_check_interval_secs =
                v.parse().unwrap_or(self.isolation.drift_check_interval_secs);
        }
        if let Ok(v) = env::var("ISOLATION_FULL_AUDIT_INTERVAL_SECS") {
            self.isolation.full_audit_interval_secs =
                v.parse().unwrap_or(self.isolation.full_audit_interval_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging =
                v.parse().unwrap_or(self.database.enable_query_logging);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_SLOW_QUERY_WARNING") {
            self.database.enable_slow_query_warning =
                v.parse().unwrap_or(self.database.enable_slow_query_warning);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms =
                v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging =
                v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes =
                v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    fn default_isolation() -> IsolationConfig {
        IsolationConfig {
            platform_admin_role: "saas_admin".to_string(),
            platform_admin_path_prefix: "/api/saas-admin".to_string(),
            sensitive_tables: vec![
                "customers".to_string(),
                "tickets".to_string(),
                "ticket_messages".to_string(),
                "notifications".to_string(),
                "parts".to_string(),
                "services".to_string(),
                "gdpr_requests".to_string(),
            ],
            audit_source_roots: vec!["src".to_string()],
            audit_allowlist: vec![
                "migrations".to_string(),
                "middleware/".to_string(),
                "audit/".to_string(),
                "services/isolation_service".to_string(),
                "database/".to_string(),
            ],
            min_expected_tables: 10,
            drift_severity: "medium".to_string(),
            startup_audit: false,
            query_check_interval_secs: 300,
            drift_check_interval_secs: 1800,
            full_audit_interval_secs: 3600,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            isolation: Self::default_isolation(),
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                jwt_secret: "omnidesk-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            isolation: IsolationConfig {
                startup_audit: true,
                ..Self::default_isolation()
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.omnidesk.example".to_string()],
                // Must be provided via JWT_SECRET outside development
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            isolation: IsolationConfig {
                startup_audit: true,
                ..Self::default_isolation()
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.omnidesk.example".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.isolation.platform_admin_role, "saas_admin");
        assert_eq!(config.isolation.platform_admin_path_prefix, "/api/saas-admin");
        assert!(!config.isolation.sensitive_tables.is_empty());
        assert_eq!(config.isolation.min_expected_tables, 10);
        assert!(!config.isolation.startup_audit);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.api.enable_request_logging);
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.isolation.startup_audit);
        assert_eq!(config.isolation.query_check_interval_secs, 300);
        assert_eq!(config.isolation.drift_check_interval_secs, 1800);
        assert_eq!(config.isolation.full_audit_interval_secs, 3600);
    }
}
