// src/lib.rs

//! # Shelf Limiter
//!
//! Per-client token bucket rate limiting for the bookshelf catalog API.
//!
//! Every client identity gets its own bucket holding up to `burst` tokens,
//! refilled at `requests_per_second`. A background janitor evicts clients that
//! have gone quiet so memory follows the active client set.
//!
//! ## Quick Example
//!
//! ```rust
//! use shelf_limiter::{LimiterConfig, RateLimiter, SystemClock};
//!
//! let config = LimiterConfig::new(2.0, 5);
//! let limiter = RateLimiter::with_config(config, SystemClock).unwrap();
//!
//! let decision = limiter.check_request("203.0.113.9".to_string()).unwrap();
//! if decision.allowed {
//!     println!("Request allowed");
//! } else {
//!     println!("Rate limited - retry after {:.2}s",
//!              decision.retry_after_seconds.unwrap_or(0.0));
//! }
//! ```

// private modules
mod bucket;
mod clock;
mod config;
mod errors;
mod identity;
mod janitor;
mod limiter;
mod middleware;
mod registry;

// public API exports
pub use bucket::TokenBucket;
pub use clock::{Clock, ClockError, SystemClock};
pub use config::{
    DEFAULT_BURST, DEFAULT_IDLE_THRESHOLD, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_SWEEP_INTERVAL,
    LimiterConfig,
};
pub use errors::{IdentityError, LimiterError};
pub use identity::{
    IdentityExtractor, PeerIpExtractor, RemoteAddrHeaderExtractor, split_host_port,
};
pub use janitor::Janitor;
pub use limiter::{RateLimitDecision, RateLimiter};
pub use middleware::{
    Outcome, RATE_LIMIT_EXCEEDED_MESSAGE, RateLimitLayer, RateLimitMiddleware, RateLimitService,
    SERVER_ERROR_MESSAGE, rate_limit_exceeded_response, server_error_response,
};
pub use registry::ClientRegistry;
