use std::sync::Arc;

use axum::extract::{Path, State};
use serde_json::json;

use crate::audit::{AuditReport, MonitoringStatus, SchemaMonitor};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantId};
use crate::services::IsolationService;

/// POST /api/saas-admin/audit - run the full combined audit immediately and
/// return the ranked report.
pub async fn run_audit(State(monitor): State<Arc<SchemaMonitor>>) -> ApiResult<AuditReport> {
    let report = monitor.audit_complete_system().await;
    Ok(ApiResponse::success(report))
}

/// GET /api/saas-admin/monitoring - monitoring state snapshot.
pub async fn monitoring_status(
    State(monitor): State<Arc<SchemaMonitor>>,
) -> ApiResult<MonitoringStatus> {
    Ok(ApiResponse::success(monitor.status().await))
}

/// POST /api/saas-admin/isolation/:tenant_id - pin the database default
/// search_path to one tenant's schema.
pub async fn isolate_tenant(Path(tenant_id): Path<String>) -> ApiResult<serde_json::Value> {
    let tenant = TenantId::parse(&tenant_id)
        .map_err(|_| ApiError::invalid_tenant_id("Tenant identifier is not a canonical UUIDv4"))?;

    let pool = DatabaseManager::platform_pool().await?;
    IsolationService::new(pool).emergency_isolate(&tenant).await?;

    Ok(ApiResponse::success(json!({
        "tenant_id": tenant.to_string(),
        "schema": tenant.schema_name(),
        "isolated": true,
    })))
}
