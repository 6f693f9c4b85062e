use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use omnidesk_api::audit::SchemaMonitor;
use omnidesk_api::config::config;
use omnidesk_api::database::DatabaseManager;
use omnidesk_api::handlers;
use omnidesk_api::middleware::{
    enforce_schema_patterns, jwt_auth_middleware, record_operations, require_platform_admin,
    resolve_tenant,
};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config();
    tracing::info!("Starting OmniDesk API in {:?} mode", config.environment);

    let pool = match DatabaseManager::platform_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Cannot start without a database configuration: {}", e);
            std::process::exit(1);
        }
    };

    let monitor = Arc::new(SchemaMonitor::from_config(pool));

    if config.isolation.startup_audit {
        tracing::info!("Running startup isolation audit");
        let report = monitor.audit_complete_system().await;
        if report.has_critical() {
            tracing::error!(
                "Startup audit found {} critical isolation violations",
                report.summary.by_severity.critical
            );
        }
    }

    monitor.clone().start().await;

    let app = app(monitor.clone());

    // Allow tests or deployments to override port via env
    let port = std::env::var("OMNIDESK_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("OmniDesk API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(monitor))
        .await
        .expect("server");
}

fn app(monitor: Arc<SchemaMonitor>) -> Router {
    // Every /api route runs the isolation pipeline: authenticate, resolve
    // the tenant schema, screen the payload, record the operation.
    let api_routes = Router::new()
        .route("/api/data/:table", get(handlers::data::list_table))
        .merge(admin_routes(monitor))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(jwt_auth_middleware))
                .layer(from_fn(resolve_tenant))
                .layer(from_fn(enforce_schema_patterns))
                .layer(from_fn(record_operations)),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api_routes);

    if config().api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config().security.enable_cors {
        router = router.layer(cors_layer());
    }
    router
}

fn admin_routes(monitor: Arc<SchemaMonitor>) -> Router {
    use handlers::admin;

    Router::new()
        .route("/api/saas-admin/audit", post(admin::run_audit))
        .route("/api/saas-admin/monitoring", get(admin::monitoring_status))
        .route(
            "/api/saas-admin/isolation/:tenant_id",
            post(admin::isolate_tenant),
        )
        .layer(from_fn(require_platform_admin))
        .with_state(monitor)
}

fn cors_layer() -> CorsLayer {
    let origins = &config().security.cors_origins;
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "OmniDesk API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant customer support platform with per-tenant schema isolation",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "data": "/api/data/:table (tenant scoped)",
                "audit": "/api/saas-admin/audit (platform admin)",
                "monitoring": "/api/saas-admin/monitoring (platform admin)",
                "isolation": "/api/saas-admin/isolation/:tenant_id (platform admin)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "Database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

async fn shutdown_signal(monitor: Arc<SchemaMonitor>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
    monitor.stop().await;
    DatabaseManager::close_all().await;
}
