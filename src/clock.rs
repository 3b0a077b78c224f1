// src/clock.rs

// clock abstraction shared by the limiter, the registry sweep and the janitor

// dependencies
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Nanoseconds per second, used wherever clock readings meet token rates.
pub(crate) const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Clock trait to abstract time retrieval.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns the current time in nanoseconds as a u64.
/// Tests swap in a controllable clock so token refill can be driven by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<u64, ClockError>;
}

/// Clock error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("system clock reads earlier than the unix epoch")]
    SystemTimeError,
}

/// SystemClock implementation using the system time.
/// Returns the current time in nanoseconds since the Unix epoch, or
/// `ClockError::SystemTimeError` if the system clock is set before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<u64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .map_err(|_| ClockError::SystemTimeError)
    }
}
