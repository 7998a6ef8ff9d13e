//! Request middleware.

pub mod hardening;

pub use hardening::security_middleware;
