//! Role-based access control middleware.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::middleware::user_auth::UserAuth;

/// Middleware that admits only roles allowed to read the audit trail.
///
/// Requires `UserAuth` to be present in request extensions (use after `require_user_auth`).
pub async fn require_audit_viewer(req: Request<Body>, next: Next) -> Response {
    let Some(auth) = req.extensions().get::<UserAuth>() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthorized",
                "message": "Authentication required"
            })),
        )
            .into_response();
    };

    match auth.user_role() {
        Some(role) if role.can_view_audit_logs() => next.run(req).await,
        _ => {
            tracing::debug!(
                user_id = %auth.user_id,
                role = %auth.role,
                "Audit log access denied"
            );
            forbidden_response("Audit logs are restricted to admins and managers")
        }
    }
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_response() {
        let response = forbidden_response("nope");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
