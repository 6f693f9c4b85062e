pub mod auth;
pub mod operation_interceptor;
pub mod response;
pub mod schema_enforcement;
pub mod tenant_context;

pub use auth::{jwt_auth_middleware, require_platform_admin, AuthUser};
pub use operation_interceptor::record_operations;
pub use response::{ApiResponse, ApiResult};
pub use schema_enforcement::enforce_schema_patterns;
pub use tenant_context::{resolve_tenant, SchemaContext, TenantId};
