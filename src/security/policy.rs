//! Path-to-limiter lookup table.
//!
//! # Design Decisions
//! - Table is built from config and swapped whole on reload; tiers whose
//!   settings did not change carry their limiter (and counters) over
//! - Matching is by path substring, strictest tier first
//! - Unmatched paths fall through to the general API tier

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{RateLimitConfig, TierConfig};
use crate::security::clock::Clock;
use crate::security::rate_limit::FixedWindowRateLimiter;

/// Which limiter configuration a request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitTier {
    Sensitive,
    Auth,
    Api,
}

impl LimitTier {
    pub const ALL: [LimitTier; 3] = [LimitTier::Sensitive, LimitTier::Auth, LimitTier::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitTier::Sensitive => "sensitive",
            LimitTier::Auth => "auth",
            LimitTier::Api => "api",
        }
    }
}

impl fmt::Display for LimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier view of one identifier, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct TierStatus {
    pub tier: LimitTier,
    pub max_requests: u32,
    pub window_ms: u64,
    pub remaining: u32,
    pub reset_time: u64,
}

/// One limiter per tier plus the rules selecting between them.
#[derive(Debug)]
pub struct RateLimitPolicy {
    sensitive: Arc<FixedWindowRateLimiter>,
    sensitive_patterns: Vec<String>,
    auth: Arc<FixedWindowRateLimiter>,
    auth_patterns: Vec<String>,
    api: Arc<FixedWindowRateLimiter>,
    exempt_paths: Vec<String>,
    config: RateLimitConfig,
}

impl RateLimitPolicy {
    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, clock, None)
    }

    /// New table for `config`, reusing this table's limiter for every tier
    /// whose window and maximum are unchanged.
    pub fn rebuild(&self, config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, clock, Some(self))
    }

    fn build(config: &RateLimitConfig, clock: Arc<dyn Clock>, previous: Option<&Self>) -> Self {
        let tier_limiter = |tier: LimitTier, settings: &TierConfig| {
            let reusable = previous.and_then(|prev| {
                let old = prev.tier_config(tier);
                (old.window_ms == settings.window_ms && old.max_requests == settings.max_requests)
                    .then(|| prev.shared_limiter(tier))
            });
            reusable.unwrap_or_else(|| {
                Arc::new(FixedWindowRateLimiter::with_clock(
                    Duration::from_millis(settings.window_ms),
                    settings.max_requests,
                    clock.clone(),
                ))
            })
        };

        Self {
            sensitive: tier_limiter(LimitTier::Sensitive, &config.sensitive),
            sensitive_patterns: config.sensitive.path_patterns.clone(),
            auth: tier_limiter(LimitTier::Auth, &config.auth),
            auth_patterns: config.auth.path_patterns.clone(),
            api: tier_limiter(LimitTier::Api, &config.api),
            exempt_paths: config.exempt_paths.clone(),
            config: config.clone(),
        }
    }

    fn tier_config(&self, tier: LimitTier) -> &TierConfig {
        match tier {
            LimitTier::Sensitive => &self.config.sensitive,
            LimitTier::Auth => &self.config.auth,
            LimitTier::Api => &self.config.api,
        }
    }

    fn shared_limiter(&self, tier: LimitTier) -> Arc<FixedWindowRateLimiter> {
        match tier {
            LimitTier::Sensitive => self.sensitive.clone(),
            LimitTier::Auth => self.auth.clone(),
            LimitTier::Api => self.api.clone(),
        }
    }

    /// Settings this table was built from.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Paths under an exempt prefix are never limited.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Tier for `path`: sensitive, then auth, else api.
    pub fn tier_for(&self, path: &str) -> LimitTier {
        if contains_any(path, &self.sensitive_patterns) {
            LimitTier::Sensitive
        } else if contains_any(path, &self.auth_patterns) {
            LimitTier::Auth
        } else {
            LimitTier::Api
        }
    }

    pub fn limiter(&self, tier: LimitTier) -> &FixedWindowRateLimiter {
        match tier {
            LimitTier::Sensitive => self.sensitive.as_ref(),
            LimitTier::Auth => self.auth.as_ref(),
            LimitTier::Api => self.api.as_ref(),
        }
    }

    /// Select the tier for `path` and return it with its limiter.
    pub fn select(&self, path: &str) -> (LimitTier, &FixedWindowRateLimiter) {
        let tier = self.tier_for(path);
        (tier, self.limiter(tier))
    }

    /// Status of `identifier` across every tier.
    pub fn status(&self, identifier: &str) -> Vec<TierStatus> {
        LimitTier::ALL
            .iter()
            .map(|&tier| {
                let limiter = self.limiter(tier);
                TierStatus {
                    tier,
                    max_requests: limiter.max_requests(),
                    window_ms: limiter.window_ms(),
                    remaining: limiter.remaining_requests(identifier),
                    reset_time: limiter.reset_time(identifier),
                }
            })
            .collect()
    }

    /// Sweep stale windows from every tier. Returns the total removed.
    pub fn cleanup(&self) -> usize {
        LimitTier::ALL
            .iter()
            .map(|&tier| self.limiter(tier).cleanup())
            .sum()
    }

    /// Identifiers tracked across all tiers.
    pub fn tracked(&self) -> usize {
        LimitTier::ALL.iter().map(|&tier| self.limiter(tier).len()).sum()
    }
}

fn contains_any(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| path.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn policy() -> (RateLimitPolicy, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (
            RateLimitPolicy::from_config(&RateLimitConfig::default(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_tier_selection() {
        let (policy, _) = policy();
        assert_eq!(policy.tier_for("/api/auth/login"), LimitTier::Auth);
        assert_eq!(policy.tier_for("/auth/callback"), LimitTier::Auth);
        assert_eq!(policy.tier_for("/api/admin/users"), LimitTier::Sensitive);
        assert_eq!(policy.tier_for("/api/proposals"), LimitTier::Api);
        assert_eq!(policy.tier_for("/"), LimitTier::Api);
    }

    #[test]
    fn test_strictest_tier_wins() {
        let (policy, _) = policy();
        assert_eq!(policy.tier_for("/api/auth/admin/reset"), LimitTier::Sensitive);
    }

    #[test]
    fn test_exempt_paths() {
        let (policy, _) = policy();
        assert!(policy.is_exempt("/health"));
        assert!(!policy.is_exempt("/api/health"));
    }

    #[test]
    fn test_tiers_count_independently() {
        let (policy, _) = policy();
        let (tier, auth) = policy.select("/api/auth/login");
        assert_eq!(tier, LimitTier::Auth);
        for _ in 0..5 {
            assert!(auth.is_allowed("10.0.0.1"));
        }
        assert!(!auth.is_allowed("10.0.0.1"));

        let (_, api) = policy.select("/api/customers");
        assert!(api.is_allowed("10.0.0.1"));
        assert_eq!(policy.tracked(), 2);
    }

    #[test]
    fn test_status_and_cleanup() {
        let (policy, clock) = policy();
        policy.limiter(LimitTier::Api).is_allowed("ip");

        let status = policy.status("ip");
        assert_eq!(status.len(), 3);
        let api = status.iter().find(|s| s.tier == LimitTier::Api).unwrap();
        assert_eq!(api.remaining, 99);

        clock.advance(Duration::from_secs(60 * 60));
        assert_eq!(policy.cleanup(), 1);
        assert_eq!(policy.tracked(), 0);
    }

    #[test]
    fn test_rebuild_keeps_unchanged_tiers() {
        let (policy, clock) = policy();
        assert!(policy.limiter(LimitTier::Api).is_allowed("ip"));
        assert!(policy.limiter(LimitTier::Auth).is_allowed("ip"));

        let mut config = RateLimitConfig::default();
        config.auth.max_requests = 10;
        config.api.path_patterns = vec!["/v2".into()];
        let rebuilt = policy.rebuild(&config, clock);

        // Api window and maximum are unchanged, so its counter survives
        assert_eq!(rebuilt.limiter(LimitTier::Api).remaining_requests("ip"), 99);
        assert_eq!(rebuilt.limiter(LimitTier::Auth).remaining_requests("ip"), 10);
        assert_eq!(rebuilt.config(), &config);
    }
}
