//! Security hardening middleware.
//!
//! Audits every request, enforces the per-tier fixed-window limits and
//! checks CSRF tokens on state-changing methods.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::request::request_id;
use crate::observability::metrics;
use crate::security::audit::{AuditEvent, Severity};
use crate::security::client_ip::client_ip;
use crate::security::rate_limit::{FixedWindowRateLimiter, RateWindow};
use crate::security::state::SecurityState;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Limiter state behind one decision, for response headers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimitInfo {
    limit: u32,
    remaining: u32,
    /// Epoch milliseconds.
    reset_time: u64,
}

impl RateLimitInfo {
    pub(crate) fn new(limiter: &FixedWindowRateLimiter, window: &RateWindow) -> Self {
        Self {
            limit: limiter.max_requests(),
            remaining: limiter.remaining_in(window),
            reset_time: window.reset_time,
        }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_time.div_ceil(1000)));
    }
}

/// 429 response carrying `Retry-After` and the limiter headers.
pub(crate) fn rate_limited_response(info: RateLimitInfo, retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Too many requests",
            "retry_after": retry_after,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    info.apply(response.headers_mut());
    response
}

/// Seconds a rejected client should wait, rounded up and at least 1.
pub fn retry_after_secs(reset_time_ms: u64, now_ms: u64) -> u64 {
    reset_time_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn security_middleware(
    State(state): State<SecurityState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let ip = client_ip(&request, &state.trusted_proxies);
    let user_agent = header_string(request.headers(), header::USER_AGENT.as_str())
        .unwrap_or_else(|| "unknown".to_string());
    let session_id = header_string(request.headers(), &state.csrf_config.session_header);
    let request_id = request_id(&request).map(str::to_string);

    let event = |action: &str| {
        AuditEvent::new(action, path.as_str())
            .client(ip.as_str(), user_agent.as_str())
            .session(session_id.clone())
    };

    if state.audit_enabled {
        state.audit.log(event("request").details(json!({
            "method": method.as_str(),
            "request_id": request_id,
        })));
    }

    // 1. Rate limit
    let policy = state.policy();
    let mut tier_label = "exempt";
    let mut limit_info = None;

    if state.rate_limit_enabled && !policy.is_exempt(&path) {
        let (tier, limiter) = policy.select(&path);
        tier_label = tier.as_str();

        let (allowed, window) = limiter.check(&ip);
        let info = RateLimitInfo::new(limiter, &window);

        if !allowed {
            let retry_after = retry_after_secs(info.reset_time, state.now_ms());
            tracing::warn!(
                client = %ip,
                tier = %tier,
                path = %path,
                retry_after_secs = retry_after,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(tier_label);
            state.audit.log(
                event("rate_limit_exceeded")
                    .severity(Severity::Medium)
                    .failed("Rate limit exceeded")
                    .details(json!({
                        "method": method.as_str(),
                        "tier": tier,
                        "retry_after": retry_after,
                        "request_id": request_id,
                    })),
            );

            metrics::record_request(method.as_str(), 429, tier_label, start);
            return rate_limited_response(info, retry_after);
        }

        limit_info = Some(info);
    }
    drop(policy);

    // 2. CSRF
    let csrf = &state.csrf_config;
    if csrf.enabled
        && is_state_changing(&method)
        && !csrf.exempt_paths.iter().any(|p| path.starts_with(p.as_str()))
    {
        let token = header_string(request.headers(), &csrf.token_header);
        let valid = match (session_id.as_deref(), token.as_deref()) {
            (Some(session), Some(token)) => state.csrf.validate(session, token),
            _ => false,
        };

        if !valid {
            tracing::warn!(client = %ip, path = %path, method = %method, "CSRF validation failed");
            metrics::record_csrf_rejected();
            state.audit.log(
                event("csrf_validation_failed")
                    .severity(Severity::High)
                    .failed("CSRF token missing or invalid")
                    .details(json!({
                        "method": method.as_str(),
                        "request_id": request_id,
                    })),
            );

            let mut response = (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Invalid CSRF token" })),
            )
                .into_response();
            if let Some(info) = limit_info {
                info.apply(response.headers_mut());
            }
            metrics::record_request(method.as_str(), 403, tier_label, start);
            return response;
        }
    }

    // 3. Handler
    let mut response = next.run(request).await;
    if let Some(info) = limit_info {
        info.apply(response.headers_mut());
    }
    metrics::record_request(method.as_str(), response.status().as_u16(), tier_label, start);
    response
}
