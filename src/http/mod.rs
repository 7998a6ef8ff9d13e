//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (assign/propagate request ID)
//!     → middleware/hardening.rs (audit, rate limit, CSRF)
//!     → handler (health, CSRF token issue, echo)
//!
//! /admin/* skips the hardening middleware and is guarded by
//! admin::auth (bearer key, failed attempts audited and limited).
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
