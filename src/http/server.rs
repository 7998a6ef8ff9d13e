//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the guard's own endpoints
//! - Wire up middleware (request ID, tracing, timeout, body limit,
//!   security headers, hardening)
//! - Bind server to listener
//! - Run the cleanup sweep and apply config reloads
//!
//! Application handlers are out of scope; unmatched paths are echoed back so
//! the middleware can be exercised end to end.

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::GuardConfig;
use crate::http::middleware::security_middleware;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::maintenance::spawn_cleanup_task;
use crate::security::headers::with_security_headers;
use crate::security::state::SecurityState;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub security: SecurityState,
    pub config: Arc<GuardConfig>,
}

/// HTTP server hosting the security middleware.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GuardConfig) -> Self {
        let security = SecurityState::from_config(&config);
        Self::with_security(config, security)
    }

    /// Create a server around an existing security state.
    pub fn with_security(config: GuardConfig, security: SecurityState) -> Self {
        let state = AppState {
            security,
            config: Arc::new(config.clone()),
        };
        let router = build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Cleanup sweep
        let cleanup_secs = self.config.rate_limit.cleanup_interval_secs;
        if cleanup_secs > 0 {
            spawn_cleanup_task(
                self.state.security.clone(),
                Duration::from_secs(cleanup_secs),
                shutdown.resubscribe(),
            );
        } else {
            tracing::warn!("Cleanup sweep disabled; stale rate-limit windows are only removed on demand");
        }

        // Config reloads
        let security = self.state.security.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                security.reload_policy(&new_config.rate_limit);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Shared security state (limiter, audit log, CSRF store).
    pub fn security(&self) -> &SecurityState {
        &self.state.security
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &GuardConfig, state: AppState) -> Router {
    let mut app: Router = Router::new()
        .route("/health", get(health))
        .route("/api/csrf-token", get(issue_csrf_token))
        .fallback(echo_handler)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.security.clone(),
            security_middleware,
        ));

    // Admin routes carry their own key check and limiting
    if config.admin.enabled {
        app = app.merge(setup_admin_router(state));
    }

    if config.security.enable_headers {
        app = with_security_headers(app);
    }

    app.layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

async fn health() -> &'static str {
    "ok"
}

/// Issue a CSRF token for the session named in the session header.
async fn issue_csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_header = &state.security.csrf_config.session_header;
    let session_id = headers
        .get(session_header.as_str())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match session_id {
        Some(session_id) => Json(state.security.csrf.generate(session_id)).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Missing {} header", session_header) })),
        )
            .into_response(),
    }
}

/// Stand-in for application handlers.
async fn echo_handler(method: Method, uri: Uri) -> Json<serde_json::Value> {
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_and_request_id() {
        let server = HttpServer::new(GuardConfig::default());
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_csrf_token_endpoint() {
        let server = HttpServer::new(GuardConfig::default());

        let response = server
            .router()
            .oneshot(Request::builder().uri("/api/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/csrf-token")
                    .header("x-session-id", "abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let token: crate::security::CsrfToken = serde_json::from_slice(&body).unwrap();
        assert!(server.security().csrf.validate("abc", &token.token));
    }

    #[tokio::test]
    async fn test_echo_fallback() {
        let server = HttpServer::new(GuardConfig::default());
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/customers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["path"], "/api/customers");
    }

    fn admin_request(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/admin/status");
        if let Some(key) = key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_authorized_admin_calls_are_not_rate_limited() {
        let mut config = GuardConfig::default();
        config.admin.api_key = "secret".into();
        let server = HttpServer::new(config);

        // Well past the sensitive tier's default of 3 per hour
        for _ in 0..10 {
            let response = server
                .router()
                .oneshot(admin_request(Some("secret")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-content-type-options"));
        }
        assert_eq!(server.security().policy().tracked(), 0);
    }

    #[tokio::test]
    async fn test_failed_admin_auth_is_audited_and_limited() {
        let mut config = GuardConfig::default();
        config.admin.api_key = "secret".into();
        let server = HttpServer::new(config);

        let mut statuses = Vec::new();
        for key in [None, Some("guess-1"), Some("guess-2"), Some("guess-3")] {
            let response = server.router().oneshot(admin_request(key)).await.unwrap();
            statuses.push(response.status());
        }
        assert_eq!(
            statuses,
            [
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::TOO_MANY_REQUESTS,
            ]
        );

        let failures = server.security().audit.logs(&crate::security::AuditFilter {
            action: Some("admin_auth_failed".into()),
            ..Default::default()
        });
        assert_eq!(failures.len(), 4);

        // The right key still gets through
        let response = server
            .router()
            .oneshot(admin_request(Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
