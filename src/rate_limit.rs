//! Process-wide fixed-window admission control.
//!
//! One counter for every connection, not per client: the limiter protects
//! the process from aggregate load.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct RateWindow {
    start: Instant,
    count: usize,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateWindow>,
    length: Duration,
    capacity: usize,
}

impl RateLimiter {
    /// The first window opens at construction time.
    pub fn new(length: Duration, capacity: usize) -> Self {
        Self::starting_at(Instant::now(), length, capacity)
    }

    pub fn starting_at(start: Instant, length: Duration, capacity: usize) -> Self {
        Self {
            window: Mutex::new(RateWindow { start, count: 0 }),
            length,
            capacity,
        }
    }

    /// Admit one request, or refuse it if the current window is full.
    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock();

        if now.saturating_duration_since(window.start) > self.length {
            window.start = now;
            window.count = 0;
        }

        if window.count >= self.capacity {
            return false;
        }
        window.count += 1;
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window_length(&self) -> Duration {
        self.length
    }
}
