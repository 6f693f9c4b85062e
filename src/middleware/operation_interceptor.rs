use axum::{extract::Request, middleware::Next, response::Response};

use super::tenant_context::SchemaContext;

/// Innermost middleware: appends `"<METHOD> <path>"` to the request's
/// schema context after the handler succeeds.
///
/// The record is coarse. It says that an operation ran under a schema
/// context, not which tables it touched; table-level detail belongs to the
/// data-access layer. Success is judged by the response status class, which
/// this service's envelope ties to the failure flag.
pub async fn record_operations(request: Request, next: Next) -> Response {
    let context = request.extensions().get::<SchemaContext>().cloned();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if let Some(context) = context {
        if response.status().is_success() {
            context
                .record_operation(format!("{} {}", method, path))
                .await;
            tracing::debug!(
                "Recorded '{} {}' under schema '{}'",
                method,
                path,
                context.schema_name
            );
        }
    }

    response
}
