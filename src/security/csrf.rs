//! Per-session CSRF tokens.
//!
//! A token is issued for a session id, must be echoed back on
//! state-changing requests, and is dropped once it expires.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::security::clock::{system_clock, Clock};

const TOKEN_BYTES: usize = 32;

/// A token bound to one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    /// Hex-encoded random secret.
    pub token: String,
    /// Expiry in epoch milliseconds.
    pub expires: u64,
}

impl CsrfToken {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires
    }
}

/// Thread-safe CSRF token store keyed by session id.
#[derive(Debug)]
pub struct CsrfProtection {
    tokens: DashMap<String, CsrfToken>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl CsrfProtection {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            clock,
        }
    }

    /// Issue a fresh token for `session_id`, replacing any previous one.
    pub fn generate(&self, session_id: &str) -> CsrfToken {
        let mut secret = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut secret);

        let token = CsrfToken {
            token: hex::encode(secret),
            expires: self.clock.now_ms().saturating_add(self.ttl_ms),
        };
        self.tokens.insert(session_id.to_string(), token.clone());
        tracing::debug!(session = %session_id, expires = token.expires, "CSRF token issued");
        token
    }

    /// Check `token` against the one issued for `session_id`.
    ///
    /// An expired token is removed and never validates.
    pub fn validate(&self, session_id: &str, token: &str) -> bool {
        let now = self.clock.now_ms();

        match self.tokens.get(session_id) {
            None => return false,
            Some(stored) if !stored.is_expired(now) => {
                return bool::from(stored.token.as_bytes().ct_eq(token.as_bytes()));
            }
            Some(_) => {}
        }

        self.tokens
            .remove_if(session_id, |_, stored| stored.is_expired(now));
        false
    }

    /// Forget the token for `session_id` (e.g. on logout).
    pub fn invalidate(&self, session_id: &str) -> bool {
        self.tokens.remove(session_id).is_some()
    }

    /// Remove every expired token. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.is_expired(now));
        before.saturating_sub(self.tokens.len())
    }

    /// Number of sessions holding a token.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
