//! Injectable wall-clock source.
//!
//! All expiry, lockout, and rate-window math compares stored timestamps
//! against `Clock::now()`; expiry is detected lazily on the next access,
//! never via a background timer. Tests substitute a settable clock.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
