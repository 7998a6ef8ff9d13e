//! Security hardening layer for the PosalPro proposal/CRM backend.
//!
//! Fixed-window rate limiting, a bounded audit log and per-session CSRF
//! tokens, wired into Axum as middleware.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::SecurityState;
