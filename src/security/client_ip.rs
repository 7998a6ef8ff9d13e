//! Client identification for rate limiting and audit entries.
//!
//! The peer socket address identifies the client. Only when that peer is a
//! configured trusted proxy are forwarded headers consulted, in order: first
//! `X-Forwarded-For` hop, then `X-Real-IP`. Anyone else can write those
//! headers, so they are ignored.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the identifier used for per-client limits.
pub fn client_ip<B>(req: &Request<B>, trusted_proxies: &[IpAddr]) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match peer {
        Some(peer) if trusted_proxies.contains(&peer) => {
            forwarded_ip(req).unwrap_or_else(|| peer.to_string())
        }
        Some(peer) => {
            if req.headers().contains_key(X_FORWARDED_FOR) {
                tracing::debug!(peer = %peer, "Ignoring forwarded header from untrusted peer");
            }
            peer.to_string()
        }
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();

    let from_forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let from_real_ip = || {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    from_forwarded_for.or_else(from_real_ip).map(str::to_string)
}
