//! Admin inspection API.
//!
//! Read-only views over the audit log and limiter state, guarded by a
//! bearer key. These routes are mounted outside the security middleware:
//! authorized operators are never rate limited, while failed key checks
//! are audited and limited by [`auth::admin_auth_middleware`].

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/audit", get(get_audit_logs))
        .route("/admin/security-events", get(get_security_events))
        .route("/admin/rate-limits/{identifier}", get(get_rate_limits))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
