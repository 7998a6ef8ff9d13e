//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps in freshly built rate-limit tiers
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the rate-limit tiers are reloadable; audit log and CSRF
//!   sessions survive a reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuditConfig, CsrfConfig, GuardConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, SecurityConfig, TierConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
