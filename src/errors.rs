// src/errors.rs

// error handling for the shelf limiter

// dependencies
use thiserror::Error;

use crate::clock::ClockError;

/// Error type for limiter configuration and request-path failures.
///
/// A rate-limit rejection is deliberately absent: an exhausted bucket is a
/// normal [`RateLimitDecision`](crate::RateLimitDecision), not an error.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("requests per second must be a positive, finite number")]
    InvalidRate,
    #[error("burst must be at least 1")]
    InvalidBurst,
    #[error("sweep interval must be greater than zero")]
    InvalidSweepInterval,
    #[error("idle threshold must be greater than zero")]
    InvalidIdleThreshold,
    #[error("environment variable {key} has an unusable value {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("clock error occurred: {0}")]
    ClockError(#[from] ClockError),
    #[error("could not identify client: {0}")]
    IdentityExtraction(#[from] IdentityError),
}

/// Failure to derive a client identity from request metadata.
///
/// This points at a defect in the request, never at client behaviour, so it
/// is surfaced as an internal error and never charged to any bucket.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("request carries no peer address")]
    MissingPeerAddr,
    #[error("malformed client address {0:?}")]
    MalformedAddr(String),
}
