use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::database::{DatabaseManager, SchemaExecutor};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SchemaContext};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/data/:table - rows from one table in the caller's tenant
/// schema. The schema comes from the resolved `SchemaContext`, never from
/// the request, so a caller can only ever read their own slice.
pub async fn list_table(
    context: Option<Extension<SchemaContext>>,
    Path(table): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let Extension(context) = context.ok_or_else(|| {
        ApiError::missing_tenant_context(
            "Data access requires a tenant schema; platform admins must target a tenant explicitly",
        )
    })?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let pool = DatabaseManager::platform_pool().await?;
    let rows = SchemaExecutor::new(pool)
        .fetch_table(&context.schema_name, &table, limit, offset)
        .await?;
    Ok(ApiResponse::success(rows))
}
