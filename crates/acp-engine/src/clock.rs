//! Time source abstraction
//!
//! The panel never calls `Utc::now()` directly; it asks its injected
//! [`Clock`]. Production code uses [`SystemClock`]; tests use
//! [`MockClock`] to drive transition windows deterministically.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// A source of wall-clock time
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A controllable time source for testing
#[derive(Clone)]
pub struct MockClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a new mock clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    /// Set the current mock time
    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.write().unwrap() = time;
    }

    /// Advance time by a duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write().unwrap();
        *current += duration;
    }

    /// Advance time by seconds
    pub fn advance_seconds(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap()
    }
}
