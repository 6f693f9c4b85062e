use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// Success envelope for API payloads: `{ "success": true, "data": ... }`.
///
/// The failure side of the envelope lives on `ApiError`, so every JSON body
/// this service emits carries the `success` flag the operation interceptor
/// and clients key on.
#[derive(Debug)]
pub struct ApiResponse<T>(T);

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to serialize response data")
                    .into_response()
            }
        }
    }
}

/// Handler return type: success envelope or an `ApiError` JSON body.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
