//! Blocking delays used to pace the engine.

use std::time::Duration;

/// Source of blocking delays.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
