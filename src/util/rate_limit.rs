//! Rate limiting utilities

use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Keyed rate limiter type alias
pub type KeyedLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Create a keyed rate limiter with the specified requests per second per key
pub fn create_keyed_limiter(requests_per_second: u32) -> Arc<KeyedLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Default intent requests per second allowed for one participant
pub const INTENT_RATE_LIMIT: u32 = 60;

/// Per-participant intent limiters.
///
/// This guards the HTTP surface against request floods; weapon cooldowns are
/// enforced separately by the combat resolver. Only seated participants
/// should be checked, since every checked id keeps an entry until pruned.
#[derive(Clone)]
pub struct IntentLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl IntentLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            limiter: create_keyed_limiter(per_second),
        }
    }

    /// Check if an intent from this participant is allowed (returns true if allowed)
    pub fn check(&self, participant_id: &Uuid) -> bool {
        self.limiter.check_key(participant_id).is_ok()
    }

    /// Drop entries whose budget has fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of participants currently tracked
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for IntentLimiter {
    fn default() -> Self {
        Self::new(INTENT_RATE_LIMIT)
    }
}
