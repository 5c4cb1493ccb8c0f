//! Call-rate budget for song.link.
//!
//! song.link allows roughly ten anonymous calls per minute. The budget keeps
//! us under that with a rolling counter and a minimum gap between calls.
//! Every user of the resolver shares one [`SharedBudget`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Limits applied by a [`RateBudget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    pub max_calls: u32,
    pub min_gap: Duration,
}

impl RatePolicy {
    /// song.link limits: 9 calls per 60 s, at least 7 s apart.
    pub const SONG_LINK: RatePolicy = RatePolicy {
        window: Duration::from_secs(60),
        max_calls: 9,
        min_gap: Duration::from_secs(7),
    };
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::SONG_LINK
    }
}

/// Rolling call counter, window start and last-call instant.
#[derive(Debug)]
pub struct RateBudget {
    policy: RatePolicy,
    window_start: Option<Instant>,
    calls: u32,
    last_call: Option<Instant>,
}

pub type SharedBudget = Arc<Mutex<RateBudget>>;

impl RateBudget {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            window_start: None,
            calls: 0,
            last_call: None,
        }
    }

    pub fn shared(policy: RatePolicy) -> SharedBudget {
        Arc::new(Mutex::new(Self::new(policy)))
    }

    /// Book the next call slot and return how long to wait before using it.
    ///
    /// The slot is recorded immediately, so concurrent callers each get
    /// their own slot even though they sleep outside the lock.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let mut at = now;
        let mut window_start = *self.window_start.get_or_insert(now);

        if at.saturating_duration_since(window_start) >= self.policy.window {
            self.calls = 0;
            window_start = at;
        }

        if self.calls >= self.policy.max_calls {
            let window_end = window_start + self.policy.window;
            if window_end > at {
                at = window_end;
            }
            self.calls = 0;
            window_start = at;
        }

        if let Some(last) = self.last_call {
            let earliest = last + self.policy.min_gap;
            if earliest > at {
                at = earliest;
            }
        }

        self.window_start = Some(window_start);
        self.last_call = Some(at);
        self.calls += 1;

        at.saturating_duration_since(now)
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(RatePolicy::default())
    }
}

/// Wait for a call slot on a shared budget.
pub async fn acquire(budget: &SharedBudget) {
    let wait = budget.lock().reserve(Instant::now());
    if !wait.is_zero() {
        tracing::debug!("Rate limit: waiting {:.1}s", wait.as_secs_f64());
        tokio::time::sleep(wait).await;
    }
}
