//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the security guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting tiers and sweep schedule.
    pub rate_limit: RateLimitConfig,

    /// Audit log settings.
    pub audit: AuditConfig,

    /// CSRF token settings.
    pub csrf: CsrfConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// One fixed-window limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TierConfig {
    /// Window duration in milliseconds.
    pub window_ms: u64,

    /// Maximum requests admitted per window.
    pub max_requests: u32,

    /// Path substrings that select this tier.
    #[serde(default)]
    pub path_patterns: Vec<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Seconds between background cleanup sweeps. 0 disables the sweep.
    pub cleanup_interval_secs: u64,

    /// Path prefixes never rate limited.
    pub exempt_paths: Vec<String>,

    /// Authentication endpoints.
    pub auth: TierConfig,

    /// Admin and other sensitive endpoints.
    pub sensitive: TierConfig,

    /// Everything else.
    pub api: TierConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_interval_secs: 60,
            exempt_paths: vec!["/health".to_string()],
            auth: TierConfig {
                window_ms: 15 * 60 * 1000,
                max_requests: 5,
                path_patterns: vec!["/api/auth".to_string(), "/auth".to_string()],
            },
            sensitive: TierConfig {
                window_ms: 60 * 60 * 1000,
                max_requests: 3,
                path_patterns: vec!["/admin".to_string(), "/sensitive".to_string()],
            },
            api: TierConfig {
                window_ms: 15 * 60 * 1000,
                max_requests: 100,
                path_patterns: Vec::new(),
            },
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record an entry for every inbound request. Rejections are always recorded.
    pub enabled: bool,

    /// Maximum number of entries kept in memory.
    pub max_logs: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_logs: 10_000,
        }
    }
}

/// CSRF protection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Require a CSRF token on state-changing requests.
    pub enabled: bool,

    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Header carrying the session identifier.
    pub session_header: String,

    /// Header carrying the CSRF token.
    pub token_header: String,

    /// Path prefixes that skip the CSRF check.
    pub exempt_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_ttl_secs: 60 * 60,
            session_header: "x-session-id".to_string(),
            token_header: "x-csrf-token".to_string(),
            exempt_paths: vec!["/api/auth".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Expose the /admin inspection routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Peers allowed to set X-Forwarded-For / X-Real-IP. Headers from any
    /// other peer are ignored and the socket address identifies the client.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
            trusted_proxies: Vec::new(),
        }
    }
}
