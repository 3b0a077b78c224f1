// tests/ratelimiter/concurrency_tests.rs

#[cfg(test)]
mod tests {

    use crate::fixtures::test_clock::TestClock;
    use shelf_limiter::{LimiterConfig, RateLimiter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    // frozen clock: no refill, so every admission spends a token from the burst
    #[test]
    fn concurrent_callers_never_double_spend() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 250;
        const BURST: u32 = 1_000;

        for _round in 0..5 {
            let clock = TestClock::new(42.0);
            let config = LimiterConfig::new(1.0, BURST);
            let limiter = RateLimiter::with_config(config, clock).unwrap();
            let admitted = AtomicUsize::new(0);
            let rejected = AtomicUsize::new(0);

            thread::scope(|scope| {
                for _ in 0..THREADS {
                    scope.spawn(|| {
                        for _ in 0..PER_THREAD {
                            if limiter.check_request("shared".to_string()).unwrap().allowed {
                                admitted.fetch_add(1, Ordering::Relaxed);
                            } else {
                                rejected.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    });
                }
            });

            let total = THREADS * PER_THREAD;
            assert_eq!(admitted.load(Ordering::Relaxed), BURST as usize);
            assert_eq!(rejected.load(Ordering::Relaxed), total - BURST as usize);
            assert_eq!(limiter.registry().tokens(&"shared".to_string()), Some(0.0));
        }
    }

    #[test]
    fn concurrent_clients_each_get_their_own_burst() {
        const CLIENTS: usize = 32;
        const ATTEMPTS: usize = 20;
        const BURST: u32 = 7;

        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(1.0, BURST);
        let limiter = RateLimiter::with_config(config, clock).unwrap();

        let per_client: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CLIENTS)
                .map(|i| {
                    let limiter = &limiter;
                    scope.spawn(move || {
                        let client = format!("10.0.0.{}", i);
                        (0..ATTEMPTS)
                            .filter(|_| limiter.check_request(client.clone()).unwrap().allowed)
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(per_client.iter().all(|&n| n == BURST as usize));
        assert_eq!(limiter.registry().len(), CLIENTS);
    }

    #[test]
    fn sweeping_while_requests_arrive_keeps_state_consistent() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(1.0, 1_000_000).idle_threshold(Duration::from_secs(1));
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();
        let admitted = AtomicUsize::new(0);

        // idle clients that a concurrent sweep is free to evict
        for i in 0..500 {
            limiter.check_request(format!("idle-{}", i)).unwrap();
        }
        clock.set_time(10.0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        if limiter.check_request("busy".to_string()).unwrap().allowed {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    limiter.sweep_idle_clients().unwrap();
                }
            });
        });

        // the busy client is never idle at t=10, so nothing it spent is lost
        assert_eq!(admitted.load(Ordering::Relaxed), 4_000);
        assert_eq!(limiter.registry().len(), 1);
        assert_eq!(
            limiter.registry().tokens(&"busy".to_string()),
            Some(1_000_000.0 - 4_000.0)
        );
    }
}
