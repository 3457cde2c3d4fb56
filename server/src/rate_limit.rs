//! Per-connection command rate limiting.
//!
//! Every inbound command passes this check before it is dispatched; a
//! rejected command is dropped silently, matching how other protocol
//! violations are handled.

use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota};

use parlor_types::ConnectionId;

pub struct CommandRateLimiter {
    limiter: DefaultKeyedRateLimiter<ConnectionId>,
}

impl CommandRateLimiter {
    pub fn new(per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(per_second.max(1)).expect("nonzero rate");
        let burst = NonZeroU32::new(burst.max(1)).expect("nonzero burst");
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self {
            limiter: DefaultKeyedRateLimiter::keyed(quota),
        }
    }

    pub fn allow(&self, connection: ConnectionId) -> bool {
        self.limiter.check_key(&connection).is_ok()
    }

    /// Drop bookkeeping for connections that have gone away.
    pub fn forget_stale(&self) {
        self.limiter.retain_recent();
    }
}
