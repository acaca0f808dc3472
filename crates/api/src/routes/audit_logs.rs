//! Audit log routes.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use domain::models::{AuditLogPage, ListAuditLogsParams};

use crate::app::AppState;
use crate::error::ApiError;

/// List audit logs with filtering and pagination, newest first.
///
/// Returns an empty page while the audit store is unavailable.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    params: Result<Query<ListAuditLogsParams>, QueryRejection>,
) -> Result<Json<AuditLogPage>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;

    tracing::debug!(
        page = query.page,
        limit = query.limit,
        entity_type = ?query.entity_type,
        has_search = query.search.is_some(),
        "Listing audit logs"
    );

    let page = state.audit_log.query(&query).await?;
    Ok(Json(page))
}
