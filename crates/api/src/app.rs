use axum::{middleware, routing::get, Router};
use persistence::backends::{AuditBackend, InMemoryAuditBackend, PgAuditBackend};
use persistence::repositories::AuditLogRepository;
use persistence::{AuditStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AuditBackendKind, Config};
use crate::middleware::{
    metrics_handler, metrics_middleware, require_audit_viewer, require_user_auth,
    security_headers_middleware, trace_id,
};
use crate::routes::{audit_logs, health};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub audit_log: AuditLogRepository,
}

/// Build the audit store selected by `audit.backend`.
///
/// Nothing is contacted here: the PostgreSQL pool connects lazily and the
/// store initializes on first use.
pub fn create_audit_store(config: &Config) -> Result<Arc<AuditStore>, StoreError> {
    let backend: Arc<dyn AuditBackend> = match config.audit.backend {
        AuditBackendKind::Postgres => {
            let pool = persistence::db::create_lazy_pool(&config.database.to_pool_config())?;
            Arc::new(PgAuditBackend::with_table(pool, config.audit.table.clone())?)
        }
        AuditBackendKind::Memory => Arc::new(InMemoryAuditBackend::new()),
    };

    Ok(Arc::new(AuditStore::with_retry_policy(
        backend,
        config.audit.retry_policy(),
    )))
}

pub fn create_app(config: Config, audit_log: AuditLogRepository) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        config: config.clone(),
        audit_log,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Audit trail (JWT + admin/manager role)
    // Middleware order: auth runs first, then the role check
    let audit_routes = Router::new()
        .route("/api/audit-logs", get(audit_logs::list_audit_logs))
        .route_layer(middleware::from_fn(require_audit_viewer))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(audit_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
