use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::security::{AuditFilter, AuditLogEntry, TierStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub rate_limit_enabled: bool,
    pub tracked_clients: usize,
    pub audit_entries: usize,
    pub audit_capacity: usize,
    pub security_events: usize,
    pub csrf_sessions: usize,
}

#[derive(Serialize)]
pub struct RateLimitStatus {
    pub identifier: String,
    pub tiers: Vec<TierStatus>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let security = &state.security;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        rate_limit_enabled: security.rate_limit_enabled,
        tracked_clients: security.policy().tracked(),
        audit_entries: security.audit.len(),
        audit_capacity: security.audit.max_logs(),
        security_events: security.audit.security_events().len(),
        csrf_sessions: security.csrf.len(),
    })
}

pub async fn get_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
) -> Json<Vec<AuditLogEntry>> {
    Json(state.security.audit.logs(&filter))
}

pub async fn get_security_events(State(state): State<AppState>) -> Json<Vec<AuditLogEntry>> {
    Json(state.security.audit.security_events())
}

pub async fn get_rate_limits(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Json<RateLimitStatus> {
    let tiers = state.security.policy().status(&identifier);
    Json(RateLimitStatus { identifier, tiers })
}
