// src/registry.rs

//! Per-client bucket storage.
//!
//! The registry exclusively owns every [`TokenBucket`]. Buckets are only
//! reachable inside a method call while the owning shard is locked, so no
//! handle can outlive a sweep that might evict it.

// dependencies
use crate::bucket::TokenBucket;
use crate::limiter::RateLimitDecision;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tracing::debug;

/// Concurrent map from client identity to that client's token bucket.
///
/// `DashMap` shards by key hash; an entry lock gives one operation exclusive
/// access to one bucket, and a sweep holds each shard only while scanning it.
#[derive(Debug)]
pub struct ClientRegistry<K>
where
    K: Hash + Eq + Clone + Debug,
{
    capacity: f64,
    refill_rate: f64,
    buckets: DashMap<K, TokenBucket>,
}

impl<K> ClientRegistry<K>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Empty registry whose new buckets get `capacity` tokens and refill at
    /// `refill_rate` tokens per second.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            buckets: DashMap::new(),
        }
    }

    /// Run `f` against the bucket for `id`, creating a full one first if the
    /// client has not been seen. The entry stays locked for the duration of `f`.
    pub fn get_or_create_with<R, F>(&self, id: K, now: u64, f: F) -> R
    where
        F: FnOnce(&K, &mut TokenBucket) -> R,
    {
        let mut guard = match self.buckets.entry(id) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                debug!(client = ?entry.key(), "new client bucket");
                entry.insert(TokenBucket::new(self.capacity, self.refill_rate, now))
            }
        };
        let (key, bucket) = guard.pair_mut();
        f(key, bucket)
    }

    /// Update the last-activity time of an existing client.
    /// Returns `false` if the client is unknown.
    pub fn touch(&self, id: &K, now: u64) -> bool {
        match self.buckets.get_mut(id) {
            Some(mut bucket) => {
                bucket.touch(now);
                true
            }
            None => false,
        }
    }

    /// Get-or-create, touch and admission test as one critical section.
    pub fn admit(&self, id: K, now: u64) -> RateLimitDecision {
        self.get_or_create_with(id, now, |client, bucket| {
            bucket.touch(now);
            let allowed = bucket.try_admit(now);
            let retry_after_seconds = (!allowed).then(|| bucket.retry_after_seconds());
            if let Some(retry_after) = retry_after_seconds {
                debug!(client = ?client, retry_after, "rate limit exceeded");
            }
            RateLimitDecision {
                allowed,
                remaining_tokens: bucket.tokens(),
                retry_after_seconds,
            }
        })
    }

    /// Remove every client idle for longer than `idle_threshold` as of `now`.
    /// Returns how many were evicted.
    pub fn sweep(&self, now: u64, idle_threshold: Duration) -> usize {
        let idle_nanos = duration_to_nanos(idle_threshold);
        let mut evicted = 0;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_sub(bucket.last_seen()) <= idle_nanos;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.buckets.contains_key(id)
    }

    /// Current token level of a client, without refilling.
    pub fn tokens(&self, id: &K) -> Option<f64> {
        self.buckets.get(id).map(|bucket| bucket.tokens())
    }

    /// Last-activity time of a client in clock nanoseconds.
    pub fn last_seen(&self, id: &K) -> Option<u64> {
        self.buckets.get(id).map(|bucket| bucket.last_seen())
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }
}

pub(crate) fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
