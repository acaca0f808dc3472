//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use persistence::StoreState;
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub audit_store: AuditStoreHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
}

/// Audit store status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditStoreHealth {
    pub backend: String,
    pub state: StoreState,
    pub retention_days: i64,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
///
/// Always answers 200: the service keeps serving (with empty audit reads)
/// while storage is down, so the body carries the detail.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.audit_log.store();

    let database = match store.pool() {
        Some(pool) => {
            let start = std::time::Instant::now();
            let connected = persistence::db::ping(pool).await;
            Some(DatabaseHealth {
                connected,
                latency_ms: connected.then(|| start.elapsed().as_millis() as u64),
            })
        }
        None => None,
    };

    let store_state = store.state();
    let database_ok = database.as_ref().map_or(true, |db| db.connected);

    Json(HealthResponse {
        status: overall_status(store_state, database_ok).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        audit_store: AuditStoreHealth {
            backend: store.backend_name().to_string(),
            state: store_state,
            retention_days: store.retention().num_days(),
        },
        database,
    })
}

fn overall_status(store: StoreState, database_ok: bool) -> &'static str {
    match store {
        StoreState::Ready if database_ok => "healthy",
        StoreState::Uninitialized => "starting",
        _ => "degraded",
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 503 only once audit storage initialization has given up.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match state.audit_log.store().state() {
        StoreState::Failed => Err(StatusCode::SERVICE_UNAVAILABLE),
        StoreState::Ready => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        StoreState::Uninitialized => Ok(Json(StatusResponse {
            status: "initializing".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(StoreState::Ready, true), "healthy");
        assert_eq!(overall_status(StoreState::Ready, false), "degraded");
        assert_eq!(overall_status(StoreState::Uninitialized, true), "starting");
        assert_eq!(overall_status(StoreState::Failed, true), "degraded");
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            audit_store: AuditStoreHealth {
                backend: "memory".to_string(),
                state: StoreState::Ready,
                retention_days: 180,
            },
            database: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["audit_store"]["state"], "ready");
        assert_eq!(json["audit_store"]["retention_days"], 180);
        assert!(json.get("database").is_none());
    }

    #[test]
    fn test_status_response() {
        let response = StatusResponse {
            status: "alive".to_string(),
        };
        assert_eq!(response.status, "alive");
    }
}
