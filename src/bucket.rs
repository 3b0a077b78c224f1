// src/bucket.rs

// token bucket admission state for a single client

use crate::clock::NANOS_PER_SEC;

// slack for rounding in refill; a level this close to a whole token counts as one
const TOKEN_EPSILON: f64 = 1e-9;

/// Admission-control state for one client.
///
/// Holds up to `capacity` tokens and refills at `refill_rate` tokens per
/// second. Every admitted request spends one token. Timestamps are clock
/// nanoseconds; `last_seen` only drives eviction and never admission.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: u64,
    last_seen: u64,
}

impl TokenBucket {
    /// A full bucket observed for the first time at `now`.
    pub fn new(capacity: f64, refill_rate: f64, now: u64) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> u64 {
        self.last_refill
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Record activity from this client.
    pub fn touch(&mut self, now: u64) {
        self.last_seen = self.last_seen.max(now);
    }

    /// Refill for the time elapsed since the last evaluation, then try to
    /// spend one token.
    pub fn try_admit(&mut self, now: u64) -> bool {
        self.refill(now);
        if self.has_whole_token() {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }

    /// Seconds until a whole token is available, zero if one already is.
    pub fn retry_after_seconds(&self) -> f64 {
        if self.has_whole_token() {
            0.0
        } else {
            (1.0 - self.tokens) / self.refill_rate
        }
    }

    fn has_whole_token(&self) -> bool {
        self.tokens + TOKEN_EPSILON >= 1.0
    }

    // a clock that steps backwards adds nothing and never rewinds last_refill
    fn refill(&mut self, now: u64) {
        let elapsed_nanos = now.saturating_sub(self.last_refill);
        if elapsed_nanos > 0 {
            let earned = elapsed_nanos as f64 * self.refill_rate / NANOS_PER_SEC;
            self.tokens = (self.tokens + earned).min(self.capacity);
            self.last_refill = now;
        }
    }
}
