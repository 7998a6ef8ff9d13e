//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first one.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GuardConfig, TierConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate_limit.{tier}.window_ms must be greater than zero")]
    ZeroWindow { tier: &'static str },

    #[error("rate_limit.{tier}.max_requests must be greater than zero")]
    ZeroMaxRequests { tier: &'static str },

    #[error("audit.max_logs must be greater than zero")]
    ZeroMaxLogs,

    #[error("csrf.token_ttl_secs must be greater than zero")]
    ZeroCsrfTtl,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must not be empty when the admin API is enabled")]
    EmptyAdminKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (tier, tier_config) in [
        ("auth", &config.rate_limit.auth),
        ("sensitive", &config.rate_limit.sensitive),
        ("api", &config.rate_limit.api),
    ] {
        validate_tier(tier, tier_config, &mut errors);
    }

    if config.audit.max_logs == 0 {
        errors.push(ValidationError::ZeroMaxLogs);
    }

    if config.csrf.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroCsrfTtl);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::EmptyAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tier(tier: &'static str, config: &TierConfig, errors: &mut Vec<ValidationError>) {
    if config.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow { tier });
    }
    if config.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests { tier });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.rate_limit.auth.window_ms = 0;
        config.rate_limit.api.max_requests = 0;
        config.audit.max_logs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroWindow { tier: "auth" }));
        assert!(errors.contains(&ValidationError::ZeroMaxRequests { tier: "api" }));
        assert!(errors.contains(&ValidationError::ZeroMaxLogs));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = GuardConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidAddress {
                field: "observability.metrics_address",
                value: "nope".into(),
            }]
        );
    }
}
