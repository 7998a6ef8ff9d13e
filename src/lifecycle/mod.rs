//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build SecurityState → Start server
//!
//! Background (maintenance.rs):
//!     interval tick → sweep stale windows and expired CSRF tokens
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger → server drains → background tasks exit
//! ```

pub mod maintenance;
pub mod shutdown;

pub use shutdown::Shutdown;
