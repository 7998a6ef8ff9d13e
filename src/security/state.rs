//! Shared security components handed to the middleware and admin API.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::{CsrfConfig, GuardConfig, RateLimitConfig};
use crate::security::audit::AuditLogger;
use crate::security::clock::{system_clock, Clock};
use crate::security::csrf::CsrfProtection;
use crate::security::policy::RateLimitPolicy;

/// Explicitly constructed security state. Cloning shares the same stores.
#[derive(Clone)]
pub struct SecurityState {
    policy: Arc<ArcSwap<RateLimitPolicy>>,
    pub audit: Arc<AuditLogger>,
    pub csrf: Arc<CsrfProtection>,
    pub rate_limit_enabled: bool,
    pub audit_enabled: bool,
    pub csrf_config: CsrfConfig,
    pub trusted_proxies: Arc<[IpAddr]>,
    clock: Arc<dyn Clock>,
}

impl SecurityState {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: &GuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy: Arc::new(ArcSwap::from_pointee(RateLimitPolicy::from_config(
                &config.rate_limit,
                clock.clone(),
            ))),
            audit: Arc::new(AuditLogger::with_clock(config.audit.max_logs, clock.clone())),
            csrf: Arc::new(CsrfProtection::with_clock(
                Duration::from_secs(config.csrf.token_ttl_secs),
                clock.clone(),
            )),
            rate_limit_enabled: config.rate_limit.enabled,
            audit_enabled: config.audit.enabled,
            csrf_config: config.csrf.clone(),
            trusted_proxies: config.security.trusted_proxies.clone().into(),
            clock,
        }
    }

    /// Current rate-limit table.
    pub fn policy(&self) -> Arc<RateLimitPolicy> {
        self.policy.load_full()
    }

    /// Replace the rate-limit table if `config` differs from the active one.
    ///
    /// Only tiers whose window or maximum changed start with fresh counters.
    /// Returns whether a swap happened.
    pub fn reload_policy(&self, config: &RateLimitConfig) -> bool {
        let current = self.policy();
        if current.config() == config {
            tracing::debug!("Rate limit settings unchanged, keeping counters");
            return false;
        }

        self.policy
            .store(Arc::new(current.rebuild(config, self.clock.clone())));
        tracing::info!(
            auth_max = config.auth.max_requests,
            sensitive_max = config.sensitive.max_requests,
            api_max = config.api.max_requests,
            "Rate limit policy reloaded"
        );
        true
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
