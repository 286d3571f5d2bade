//! Time sources
//!
//! Period buckets and expiry are evaluated against whatever clock the token
//! was built with. Production uses wall-clock UTC; tests and simulations
//! drive a `ManualClock`.

use std::sync::atomic::{AtomicU64, Ordering};

use openibank_types::UnixSeconds;

/// Source of the current unix time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> UnixSeconds;
}

/// Wall-clock UTC time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixSeconds {
        // Pre-epoch clocks read as the epoch.
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: UnixSeconds) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: UnixSeconds) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`, returning the new time
    pub fn advance(&self, seconds: u64) -> UnixSeconds {
        let previous = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(seconds))
            })
            .unwrap_or_else(|t| t);
        previous.saturating_add(seconds)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixSeconds {
        self.now.load(Ordering::SeqCst)
    }
}
