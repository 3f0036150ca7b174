//! Crash-loop breaker for the boot loop.
//!
//! Counts spawn attempts inside a sliding observation window. The window is
//! only inspected at the top of each loop iteration, so no background timer
//! is needed: if more than `window` has passed since the previous attempt,
//! earlier attempts are forgotten.

use std::time::{Duration, Instant};

/// Default tracking window between related boot attempts.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);
/// Default number of attempts inside one window before the breaker trips.
pub const DEFAULT_MAX_BOOTS: u32 = 3;

/// Result of checking the breaker before a spawn attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerCheck {
    /// Spawning is allowed. `window_reset` is true when stale attempts were forgotten.
    Proceed { window_reset: bool },
    /// Too many attempts inside the window.
    Tripped { recent_boots: u32 },
}

#[derive(Debug, Clone)]
pub struct CrashLoopBreaker {
    window: Duration,
    max_boots: u32,
    recent_boots: u32,
    last_attempt: Option<Instant>,
}

impl CrashLoopBreaker {
    pub fn new(window: Duration, max_boots: u32) -> Self {
        Self {
            window,
            max_boots,
            recent_boots: 0,
            last_attempt: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_boots(&self) -> u32 {
        self.max_boots
    }

    pub fn recent_boots(&self) -> u32 {
        self.recent_boots
    }

    /// Expire the window if needed, then report whether another spawn is allowed.
    ///
    /// Does not count an attempt; call [`CrashLoopBreaker::record_attempt`] once
    /// the spawn is going ahead.
    pub fn check(&mut self, now: Instant) -> BreakerCheck {
        let expired = match self.last_attempt {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.window,
        };
        let window_reset = expired && self.recent_boots > 0;
        if expired {
            self.recent_boots = 0;
        }

        if self.recent_boots >= self.max_boots {
            return BreakerCheck::Tripped {
                recent_boots: self.recent_boots,
            };
        }
        BreakerCheck::Proceed { window_reset }
    }

    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.recent_boots = self.recent_boots.saturating_add(1);
    }

    /// Forget all counted attempts (used after a rollback).
    pub fn reset(&mut self) {
        self.recent_boots = 0;
    }
}

impl Default for CrashLoopBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_BOOTS)
    }
}
