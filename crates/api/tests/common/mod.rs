//! Common test utilities for integration tests.
//!
//! Apps are built over the in-memory audit backend unless a test asks for a
//! PostgreSQL pool through `TEST_DATABASE_URL`.

// Not every integration test uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use persistence::backends::{AuditBackend, InMemoryAuditBackend};
use persistence::repositories::AuditLogRepository;
use persistence::{AuditStore, RetryPolicy};
use shared::jwt::JwtConfig;
use std::sync::Arc;
use std::time::Duration;
use warehouse_api::{
    app::create_app,
    config::{
        AuditBackendKind, AuditConfig, Config, DatabaseConfig, JwtAuthConfig, LoggingConfig,
        SecurityConfig, ServerConfig,
    },
};

/// Shared HS256 secret used by test tokens.
pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789";

/// Test configuration backed by the in-memory audit store.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").unwrap_or_default(),
            max_connections: 5,
            min_connections: 0,
            connect_timeout_secs: 5,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            hsts_enabled: false,
        },
        jwt: JwtAuthConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_secs: 3600,
            leeway_secs: 0,
        },
        audit: AuditConfig {
            backend: AuditBackendKind::Memory,
            table: "audit_logs".to_string(),
            init_max_attempts: 2,
            init_retry_delay_ms: 1,
            init_attempt_timeout_ms: 500,
            sweep_interval_minutes: 60,
        },
    }
}

/// Fast retry policy so failing stores give up quickly.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1))
}

/// Repository over the given backend.
pub fn repository(backend: Arc<dyn AuditBackend>) -> AuditLogRepository {
    AuditLogRepository::new(Arc::new(AuditStore::with_retry_policy(
        backend,
        fast_retry(),
    )))
}

/// App over a fresh in-memory backend, plus the repository for seeding.
pub fn memory_app() -> (Router, AuditLogRepository, Arc<InMemoryAuditBackend>) {
    let backend = Arc::new(InMemoryAuditBackend::new());
    let repo = repository(backend.clone());
    (create_test_app(repo.clone()), repo, backend)
}

/// App whose audit store can never initialize.
pub fn unreachable_app() -> (Router, AuditLogRepository) {
    let repo = repository(Arc::new(InMemoryAuditBackend::unreachable()));
    (create_test_app(repo.clone()), repo)
}

/// Create a test application router.
pub fn create_test_app(repo: AuditLogRepository) -> Router {
    create_app(test_config(), repo)
}

/// Access token for `role`, signed with the test secret.
pub fn token_for(role: &str) -> String {
    let config = JwtConfig::new(TEST_JWT_SECRET, 3600).unwrap();
    let email = format!("{}@example.com", role);
    config
        .generate_access_token(&format!("user-{}", role), Some(&email), role)
        .unwrap()
        .0
}

/// Build a GET request with authentication.
pub fn get_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Build an unauthenticated GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
