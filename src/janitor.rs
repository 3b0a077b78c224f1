// src/janitor.rs

//! Background eviction of idle clients.
//!
//! The janitor wakes on a fixed interval and sweeps the limiter's registry.
//! A failed or panicking sweep is logged and the loop carries on with the
//! next tick; the task only ends when it is cancelled.

// dependencies
use crate::clock::Clock;
use crate::errors::LimiterError;
use crate::limiter::RateLimiter;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle to the running sweep task.
///
/// Dropping the handle cancels the task; [`shutdown`](Self::shutdown) also
/// waits for it to finish.
#[derive(Debug)]
pub struct Janitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    pub(crate) fn spawn<K, C>(limiter: Arc<RateLimiter<K, C>>, interval: Duration) -> Self
    where
        K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
        C: Clock + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(limiter, interval, cancel.clone()));
        info!(interval_secs = interval.as_secs_f64(), "rate limiter janitor started");

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop sweeping and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "rate limiter janitor did not exit cleanly");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<K, C>(limiter: Arc<RateLimiter<K, C>>, interval: Duration, cancel: CancellationToken)
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    C: Clock + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately and there is nothing to evict yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => sweep_once(&limiter).await,
        }
    }

    info!("rate limiter janitor stopped");
}

// sweeping is O(clients) with no I/O, so it runs on the blocking pool; a
// panic there surfaces as a JoinError instead of killing the loop
async fn sweep_once<K, C>(limiter: &Arc<RateLimiter<K, C>>)
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    C: Clock + 'static,
{
    let limiter = Arc::clone(limiter);
    match tokio::task::spawn_blocking(move || {
        let evicted = limiter.sweep_idle_clients()?;
        Ok::<_, LimiterError>((evicted, limiter.registry().len()))
    })
    .await
    {
        Ok(Ok((0, remaining))) => debug!(remaining, "janitor sweep found no idle clients"),
        Ok(Ok((evicted, remaining))) => {
            info!(evicted, remaining, "janitor evicted idle clients")
        }
        Ok(Err(err)) => warn!(error = %err, "janitor sweep failed, retrying next interval"),
        Err(err) => error!(error = %err, "janitor sweep panicked, retrying next interval"),
    }
}
