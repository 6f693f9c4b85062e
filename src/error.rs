// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Tenant-isolation failures get dedicated variants so the codes surfaced to
/// clients are fixed at compile time instead of assembled from strings at
/// each call site.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidTenantId(String),
    QueryPatternViolation(String),

    // 401 Unauthorized
    Unauthorized(String),
    MissingTenantContext(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
    TenantNotFound(String),
    SchemaNotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
    SchemaEnforcementError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidTenantId(_) => 400,
            ApiError::QueryPatternViolation(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::MissingTenantContext(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TenantNotFound(_) => 404,
            ApiError::SchemaNotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::SchemaEnforcementError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidTenantId(msg) => msg,
            ApiError::QueryPatternViolation(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::MissingTenantContext(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::TenantNotFound(msg) => msg,
            ApiError::SchemaNotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::SchemaEnforcementError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidTenantId(_) => "INVALID_TENANT_ID",
            ApiError::QueryPatternViolation(_) => "QUERY_PATTERN_VIOLATION",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::MissingTenantContext(_) => "MISSING_TENANT_CONTEXT",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            ApiError::SchemaNotFound(_) => "SCHEMA_NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::SchemaEnforcementError(_) => "SCHEMA_ENFORCEMENT_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_tenant_id(message: impl Into<String>) -> Self {
        ApiError::InvalidTenantId(message.into())
    }

    pub fn query_pattern_violation(message: impl Into<String>) -> Self {
        ApiError::QueryPatternViolation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn missing_tenant_context(message: impl Into<String>) -> Self {
        ApiError::MissingTenantContext(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn schema_enforcement_error(message: impl Into<String>) -> Self {
        ApiError::SchemaEnforcementError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::ConfigMissing(name) => {
                tracing::error!("Missing database configuration: {}", name);
                ApiError::service_unavailable("Database not configured")
            }
            crate::database::manager::DatabaseError::InvalidIdentifier(name) => {
                ApiError::bad_request(format!("Invalid identifier: {}", name))
            }
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::services::isolation_service::IsolationError> for ApiError {
    fn from(err: crate::services::isolation_service::IsolationError) -> Self {
        match err {
            crate::services::isolation_service::IsolationError::TenantNotFound(id) => {
                ApiError::TenantNotFound(format!("Tenant '{}' not found or inactive", id))
            }
            crate::services::isolation_service::IsolationError::SchemaNotFound(schema) => {
                ApiError::SchemaNotFound(format!("Schema '{}' does not exist", schema))
            }
            crate::services::isolation_service::IsolationError::Database(e) => {
                tracing::error!("Isolation procedure database error: {}", e);
                ApiError::internal_server_error("Emergency isolation failed")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
