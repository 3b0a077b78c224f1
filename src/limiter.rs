// src/limiter.rs

// shelf-limiter: per-client token bucket rate limiting

// dependencies
use crate::clock::{Clock, SystemClock};
use crate::config::LimiterConfig;
use crate::errors::LimiterError;
use crate::janitor::Janitor;
use crate::registry::ClientRegistry;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// The main RateLimiter model.
/// K is the type used to identify clients (e.g., String, IpAddr, etc.).
/// C is the clock type, defaulting to SystemClock.
/// Share it behind an `Arc` so the janitor task can sweep the same registry.
#[derive(Debug)]
pub struct RateLimiter<K, C = SystemClock>
where
    K: Hash + Eq + Clone + Debug,
    C: Clock,
{
    config: LimiterConfig,
    registry: ClientRegistry<K>,
    clock: C,
}

// methods for the RateLimiter type
impl<K, C> RateLimiter<K, C>
where
    K: Hash + Eq + Clone + Debug,
    C: Clock,
{
    // method to create a new rate limiter from a config object
    pub fn with_config(config: LimiterConfig, clock: C) -> Result<Self, LimiterError> {
        config.validate()?;
        let registry = ClientRegistry::new(f64::from(config.burst), config.requests_per_second);

        Ok(Self {
            config,
            registry,
            clock,
        })
    }

    // accessor method to return the sustained rate in requests per second
    pub fn rate(&self) -> f64 {
        self.config.requests_per_second
    }

    // accessor method to return the burst capacity
    pub fn burst(&self) -> u32 {
        self.config.burst
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Shared view of the per-client state, for inspection and tests.
    pub fn registry(&self) -> &ClientRegistry<K> {
        &self.registry
    }

    /// Decide whether one request from `client_id` may proceed.
    ///
    /// A disabled limiter admits everything without touching the registry.
    /// Otherwise the client's bucket is created on first sight, touched and
    /// charged in a single critical section that is released before this
    /// returns.
    pub fn check_request(&self, client_id: K) -> Result<RateLimitDecision, LimiterError> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::unlimited());
        }

        let now = self.clock.now()?;
        Ok(self.registry.admit(client_id, now))
    }

    // method to clean up clients idle for longer than `max_idle`
    pub fn cleanup_stale_clients(&self, max_idle: Duration) -> Result<usize, LimiterError> {
        let now = self.clock.now()?;
        Ok(self.registry.sweep(now, max_idle))
    }

    /// Sweep with the configured idle threshold.
    pub fn sweep_idle_clients(&self) -> Result<usize, LimiterError> {
        self.cleanup_stale_clients(self.config.idle_threshold)
    }
}

impl<K, C> RateLimiter<K, C>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    C: Clock + 'static,
{
    /// Start the background sweep on the current tokio runtime.
    ///
    /// The returned [`Janitor`] owns the task: dropping it or calling
    /// [`Janitor::shutdown`] stops the sweeping.
    pub fn spawn_janitor(self: &Arc<Self>) -> Janitor {
        Janitor::spawn(Arc::clone(self), self.config.sweep_interval)
    }
}

/// Result of a rate limiting decision with metadata for HTTP responses
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    /// Whether the request should be allowed
    pub allowed: bool,
    /// Tokens left in the client's bucket after this decision
    pub remaining_tokens: f64,
    /// Seconds until the client can make another request (when denied)
    pub retry_after_seconds: Option<f64>,
}

impl RateLimitDecision {
    fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining_tokens: f64::INFINITY,
            retry_after_seconds: None,
        }
    }
}
