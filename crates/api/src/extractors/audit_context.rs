//! Request provenance extractor for audit entries.
//!
//! Handlers that mutate business entities take a [`RequestAuditContext`] and
//! pass its inner [`AuditContext`] to the audit helpers.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use domain::services::AuditContext;
use std::convert::Infallible;
use uuid::Uuid;

use crate::middleware::trace_id::{
    CorrelationId, RequestId, CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
};
use crate::middleware::user_auth::UserAuth;

const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
const REAL_IP_HEADER: &str = "X-Real-IP";

/// Audit context captured from the current request.
///
/// Never rejects: fields that cannot be determined stay empty, and a
/// correlation id is generated when the request carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAuditContext(pub AuditContext);

impl RequestAuditContext {
    pub fn into_inner(self) -> AuditContext {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestAuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<UserAuth>();

        let context = AuditContext {
            user_id: user.map(|u| u.user_id.clone()),
            user_email: user.and_then(|u| u.email.clone()),
            correlation_id: Some(correlation_id(parts)),
            ip_address: client_ip(parts),
            method: Some(parts.method.as_str().to_string()),
            path: Some(
                parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string()),
            ),
        };

        Ok(Self(context))
    }
}

fn correlation_id(parts: &Parts) -> String {
    if let Some(CorrelationId(id)) = parts.extensions.get::<CorrelationId>() {
        return id.clone();
    }
    if let Some(id) = header(&parts.headers, CORRELATION_ID_HEADER) {
        return id;
    }
    if let Some(RequestId(id)) = parts.extensions.get::<RequestId>() {
        return id.clone();
    }
    header(&parts.headers, REQUEST_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn client_ip(parts: &Parts) -> Option<String> {
    let forwarded = header(&parts.headers, FORWARDED_FOR_HEADER).and_then(|list| {
        list.split(',')
            .map(str::trim)
            .find(|hop| !hop.is_empty())
            .map(str::to_string)
    });

    forwarded
        .or_else(|| header(&parts.headers, REAL_IP_HEADER))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> AuditContext {
        let (mut parts, _) = req.into_parts();
        RequestAuditContext::from_request_parts(&mut parts, &())
            .await
            .unwrap()
            .into_inner()
    }

    #[tokio::test]
    async fn test_extracts_request_fields() {
        let req = Request::builder()
            .method("PATCH")
            .uri("/api/inventory/inv-1?force=true")
            .header(CORRELATION_ID_HEADER, "corr-1")
            .header(FORWARDED_FOR_HEADER, "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();

        let ctx = extract(req).await;
        assert_eq!(ctx.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(ctx.method.as_deref(), Some("PATCH"));
        assert_eq!(ctx.path.as_deref(), Some("/api/inventory/inv-1?force=true"));
        assert_eq!(ctx.user_id, None);
    }

    #[tokio::test]
    async fn test_prefers_middleware_correlation_id() {
        let mut req = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, "from-header")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(CorrelationId("from-middleware".into()));

        let ctx = extract(req).await;
        assert_eq!(ctx.correlation_id.as_deref(), Some("from-middleware"));
    }

    #[tokio::test]
    async fn test_falls_back_to_request_id_then_generated() {
        let req = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "req-5")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.correlation_id.as_deref(), Some("req-5"));

        let req = Request::builder().uri("/").body(()).unwrap();
        let generated = extract(req).await.correlation_id.unwrap();
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[tokio::test]
    async fn test_uses_connect_info_without_proxy_headers() {
        let mut req = Request::builder().uri("/").body(()).unwrap();
        let addr: SocketAddr = "192.0.2.10:55000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let ctx = extract(req).await;
        assert_eq!(ctx.ip_address.as_deref(), Some("192.0.2.10"));
    }

    #[tokio::test]
    async fn test_carries_authenticated_user() {
        let mut req = Request::builder().uri("/").body(()).unwrap();
        req.extensions_mut().insert(UserAuth {
            user_id: "user-7".into(),
            email: Some("ops@example.com".into()),
            role: "manager".into(),
            jti: None,
        });

        let ctx = extract(req).await;
        assert_eq!(ctx.user_id.as_deref(), Some("user-7"));
        assert_eq!(ctx.user_email.as_deref(), Some("ops@example.com"));
    }
}
