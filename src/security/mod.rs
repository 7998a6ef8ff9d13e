//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (who is calling)
//!     → audit.rs (record the request)
//!     → policy.rs → rate_limit.rs (per-client fixed-window limits)
//!     → csrf.rs (token check on state-changing methods)
//!     → Pass to handler
//!     → headers.rs (hardening response headers)
//! ```
//!
//! # Design Decisions
//! - All state is constructed explicitly (`SecurityState`) and injected,
//!   never global
//! - Rejections are ordinary outcomes, not errors
//! - State is per-process and in-memory only

pub mod audit;
pub mod client_ip;
pub mod clock;
pub mod csrf;
pub mod headers;
pub mod policy;
pub mod rate_limit;
pub mod state;

pub use audit::{AuditEvent, AuditFilter, AuditLogEntry, AuditLogger, Severity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use csrf::{CsrfProtection, CsrfToken};
pub use policy::{LimitTier, RateLimitPolicy, TierStatus};
pub use rate_limit::{FixedWindowRateLimiter, RateWindow};
pub use state::SecurityState;
