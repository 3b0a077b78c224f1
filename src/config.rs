// src/config.rs

//! Configuration types for the shelf limiter

// dependencies
use crate::errors::LimiterError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default sustained rate, matching the catalog server's `-limiter-rps` flag.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;
/// Default burst, matching the catalog server's `-limiter-burst` flag.
pub const DEFAULT_BURST: u32 = 5;
/// How often the janitor sweeps idle clients.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Idle time after which a client's bucket is evicted.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(180);

const ENV_ENABLED: &str = "LIMITER_ENABLED";
const ENV_RPS: &str = "LIMITER_RPS";
const ENV_BURST: &str = "LIMITER_BURST";
const ENV_SWEEP_INTERVAL: &str = "LIMITER_SWEEP_INTERVAL_SECS";
const ENV_IDLE_THRESHOLD: &str = "LIMITER_IDLE_THRESHOLD_SECS";

/// Configuration for rate limiter behavior.
///
/// Loaded once at startup; durations are (de)serialized as whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub(crate) enabled: bool,
    pub(crate) requests_per_second: f64,
    pub(crate) burst: u32,
    #[serde(with = "duration_secs")]
    pub(crate) sweep_interval: Duration,
    #[serde(with = "duration_secs")]
    pub(crate) idle_threshold: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }
}

impl LimiterConfig {
    /// Create a new enabled configuration with rate and burst settings and
    /// default janitor timings.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
            ..Self::default()
        }
    }

    /// Builder-style: turn the whole limiter on or off
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder-style: set rate per second
    pub fn rate(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Builder-style: set burst capacity
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Builder-style: set how often idle clients are swept
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Builder-style: set how long a client may stay idle before eviction
    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub fn burst_capacity(&self) -> u32 {
        self.burst
    }

    pub fn sweep_every(&self) -> Duration {
        self.sweep_interval
    }

    pub fn idle_after(&self) -> Duration {
        self.idle_threshold
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(LimiterError::InvalidRate);
        }
        if self.burst == 0 {
            return Err(LimiterError::InvalidBurst);
        }
        if self.sweep_interval.is_zero() {
            return Err(LimiterError::InvalidSweepInterval);
        }
        if self.idle_threshold.is_zero() {
            return Err(LimiterError::InvalidIdleThreshold);
        }
        Ok(())
    }

    /// Build a configuration from `LIMITER_*` environment variables.
    ///
    /// Unset variables keep their defaults. The result is validated.
    pub fn from_env() -> Result<Self, LimiterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LimiterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(enabled) = parse_var::<bool, _>(&lookup, ENV_ENABLED)? {
            config.enabled = enabled;
        }
        if let Some(rps) = parse_var::<f64, _>(&lookup, ENV_RPS)? {
            config.requests_per_second = rps;
        }
        if let Some(burst) = parse_var::<u32, _>(&lookup, ENV_BURST)? {
            config.burst = burst;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SWEEP_INTERVAL)? {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_IDLE_THRESHOLD)? {
            config.idle_threshold = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, LimiterError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LimiterError::InvalidEnv { key, value: raw }),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
