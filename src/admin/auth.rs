use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::http::middleware::hardening::{rate_limited_response, retry_after_secs, RateLimitInfo};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::audit::{AuditEvent, Severity};
use crate::security::client_ip::client_ip;

/// Require `Authorization: Bearer <admin.api_key>`.
///
/// Authorized calls are not rate limited. Failed attempts are audited and
/// counted against the limiter tier of the requested path, so guessing the
/// key runs into 429s.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.admin.api_key.as_bytes();
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|key| bool::from(key.as_bytes().ct_eq(expected)));

    if authorized {
        return next.run(request).await;
    }

    let security = &state.security;
    let path = request.uri().path().to_string();
    let ip = client_ip(&request, &security.trusted_proxies);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::warn!(client = %ip, path = %path, "Admin request rejected");
    security.audit.log(
        AuditEvent::new("admin_auth_failed", path.as_str())
            .severity(Severity::High)
            .client(ip.as_str(), user_agent)
            .failed("Missing or invalid admin key"),
    );

    if security.rate_limit_enabled {
        let policy = security.policy();
        let (tier, limiter) = policy.select(&path);
        let (allowed, window) = limiter.check(&ip);
        if !allowed {
            metrics::record_rate_limited(tier.as_str());
            let retry_after = retry_after_secs(window.reset_time, security.now_ms());
            return rate_limited_response(RateLimitInfo::new(limiter, &window), retry_after);
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
