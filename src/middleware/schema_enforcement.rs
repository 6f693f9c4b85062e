use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;

use super::tenant_context::SchemaContext;
use crate::config;
use crate::error::ApiError;

/// Shared-schema reference patterns checked against request payloads.
///
/// This is a textual filter, not a SQL parser. It is deliberately
/// conservative and will miss obfuscated SQL; it exists as a
/// defense-in-depth layer behind the schema-qualified executor, not as the
/// sole guarantee.
static SHARED_SCHEMA_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    // Substring containment, not word matching: `xFROM public.t` still
    // carries the clause and still gets rejected.
    [
        (r"(?i)from\s+public\.", "FROM public."),
        (r"(?i)join\s+public\.", "JOIN public."),
        (r"(?i)update\s+public\.", "UPDATE public."),
        (r"(?i)insert\s+into\s+public\.", "INSERT INTO public."),
        (r"(?i)delete\s+from\s+public\.", "DELETE FROM public."),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
    .collect()
});

/// Returns the matched clause label when `text` references the shared schema.
pub(crate) fn match_shared_schema(text: &str) -> Option<&'static str> {
    SHARED_SCHEMA_PATTERNS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, label)| *label)
}

/// Middleware that rejects payloads carrying raw SQL fragments aimed at the
/// shared schema.
///
/// Runs after `resolve_tenant`: a request without a `SchemaContext` was
/// either already rejected upstream or is a platform-admin bypass, so this
/// stage passes it through untouched.
pub async fn enforce_schema_patterns(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<SchemaContext>().is_none() {
        return Ok(next.run(request).await);
    }

    let limit = config::config().api.max_request_size_bytes;
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::error!("Failed to buffer request body for schema enforcement: {}", e);
        ApiError::schema_enforcement_error("Failed to inspect request payload")
    })?;

    if !bytes.is_empty() {
        let text = String::from_utf8_lossy(&bytes);
        if let Some(clause) = match_shared_schema(&text) {
            tracing::warn!(
                "Rejected payload referencing shared schema via '{}' on {} {}",
                clause,
                parts.method,
                parts.uri.path()
            );
            return Err(ApiError::query_pattern_violation(format!(
                "Request payload references the shared schema ({})",
                clause
            )));
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}
