use axum::{extract::Request, middleware::Next, response::Response};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::config;
use crate::error::ApiError;

/// Validated tenant identifier.
///
/// Accepts only the canonical lowercase hyphenated UUIDv4 textual form
/// (8-4-4-4-12, version nibble `4`, variant nibble in `8 9 a b`). The strict
/// grammar exists because the identifier is concatenated into a schema name
/// downstream; anything looser would open schema-name injection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantId(Uuid);

#[derive(Debug, thiserror::Error)]
#[error("tenant id must be a canonical lowercase UUIDv4")]
pub struct TenantIdError;

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self, TenantIdError> {
        if !is_canonical_v4(raw) {
            return Err(TenantIdError);
        }
        let uuid = Uuid::parse_str(raw).map_err(|_| TenantIdError)?;
        Ok(TenantId(uuid))
    }

    /// Schema name for this tenant: `tenant_` prefix plus the identifier
    /// with every hyphen replaced by an underscore. No other characters
    /// are touched.
    pub fn schema_name(&self) -> String {
        format!("tenant_{}", self.0.to_string().replace('-', "_"))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_canonical_v4(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, &c) in bytes.iter().enumerate() {
        let ok = match i {
            8 | 13 | 18 | 23 => c == b'-',
            14 => c == b'4',
            19 => matches!(c, b'8' | b'9' | b'a' | b'b'),
            _ => matches!(c, b'0'..=b'9' | b'a'..=b'f'),
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Per-request tenant schema context, injected by `resolve_tenant`.
///
/// Clones share the operations list: the interceptor appends to the same
/// records the handler's clone sees. The list lives and dies with the
/// request; nothing here is persisted.
#[derive(Clone, Debug)]
pub struct SchemaContext {
    pub schema_name: String,
    pub is_validated: bool,
    operations: Arc<Mutex<Vec<String>>>,
}

impl SchemaContext {
    pub fn new(tenant: &TenantId) -> Self {
        Self {
            schema_name: tenant.schema_name(),
            is_validated: true,
            operations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn record_operation(&self, operation: impl Into<String>) {
        self.operations.lock().await.push(operation.into());
    }

    pub async fn operations(&self) -> Vec<String> {
        self.operations.lock().await.clone()
    }
}

/// Middleware that resolves the authenticated principal into a tenant
/// schema context.
///
/// Platform admins on the admin route prefix bypass tenant binding; that is
/// the only exception, and it requires role AND path to match. Everyone
/// else must carry a valid tenant identifier or the request is rejected.
pub async fn resolve_tenant(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let isolation = &config::config().isolation;
    let path = request.uri().path().to_string();
    let auth_user = request.extensions().get::<AuthUser>().cloned();

    if let Some(user) = &auth_user {
        if user.role == isolation.platform_admin_role
            && path.starts_with(&isolation.platform_admin_path_prefix)
        {
            tracing::info!(
                "Platform admin bypass: '{}' on {} without tenant schema",
                user.user,
                path
            );
            return Ok(next.run(request).await);
        }
    }

    let user = auth_user.ok_or_else(|| {
        ApiError::missing_tenant_context("Authentication context required before tenant resolution")
    })?;

    if user.tenant_id.trim().is_empty() {
        return Err(ApiError::missing_tenant_context(
            "No tenant associated with this session",
        ));
    }

    let tenant = TenantId::parse(&user.tenant_id).map_err(|_| {
        tracing::warn!("Rejected malformed tenant identifier: '{}'", user.tenant_id);
        ApiError::invalid_tenant_id("Tenant identifier is not a canonical UUIDv4")
    })?;

    let context = SchemaContext::new(&tenant);
    tracing::debug!("Resolved schema '{}' for {}", context.schema_name, path);
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
