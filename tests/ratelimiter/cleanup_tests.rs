// tests/ratelimiter/cleanup_tests.rs

#[cfg(test)]
mod tests {

    use crate::fixtures::test_clock::TestClock;
    use shelf_limiter::{LimiterConfig, RateLimiter};
    use std::time::Duration;

    #[test]
    fn cleanup_removes_stale_clients() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(1.0, 1);
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();

        // Add some clients at different times
        assert!(limiter.check_request("client1".to_string()).unwrap().allowed); // seen t=0

        clock.set_time(5.0);
        assert!(limiter.check_request("client2".to_string()).unwrap().allowed); // seen t=5

        clock.set_time(10.0);
        assert!(limiter.check_request("client3".to_string()).unwrap().allowed); // seen t=10

        assert_eq!(limiter.registry().len(), 3);

        // At t=12 with a 4.5s threshold, anything seen before t=7.5 goes
        clock.set_time(12.0);
        let evicted = limiter
            .cleanup_stale_clients(Duration::from_millis(4_500))
            .unwrap();

        assert_eq!(evicted, 2);
        assert_eq!(limiter.registry().len(), 1);
        assert!(!limiter.registry().contains(&"client1".to_string()));
        assert!(!limiter.registry().contains(&"client2".to_string()));
        assert!(limiter.registry().contains(&"client3".to_string()));

        // any idle time at all is too much for a zero threshold
        limiter.cleanup_stale_clients(Duration::ZERO).unwrap();
        assert!(limiter.registry().is_empty());
    }

    #[test]
    fn cleanup_handles_empty_state() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(1.0, 1);
        let limiter = RateLimiter::<String, _>::with_config(config, clock).unwrap();

        assert_eq!(limiter.cleanup_stale_clients(Duration::from_secs(1)).unwrap(), 0);
        assert!(limiter.registry().is_empty());
    }

    #[test]
    fn cleanup_preserves_recent_clients() {
        let clock = TestClock::new(100.0);
        let config = LimiterConfig::new(10.0, 1);
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();

        for i in 0..5 {
            let client = format!("client{}", i);
            assert!(limiter.check_request(client).unwrap().allowed);
            clock.advance(0.01);
        }

        let initial_count = limiter.registry().len();
        limiter.cleanup_stale_clients(Duration::from_secs(1)).unwrap();
        assert_eq!(limiter.registry().len(), initial_count);
    }

    #[test]
    fn active_client_survives_any_number_of_sweeps() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(1.0, 1).idle_threshold(Duration::from_secs(180));
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();

        limiter.check_request("regular").unwrap();
        limiter.check_request("drive-by").unwrap();

        // "regular" shows up every 120s, a sweep runs every 60s
        for minute in 1..=20 {
            clock.set_time(minute as f64 * 60.0);
            if minute % 2 == 0 {
                limiter.check_request("regular").unwrap();
            }
            limiter.sweep_idle_clients().unwrap();
            assert!(limiter.registry().contains(&"regular"));
        }
        assert!(!limiter.registry().contains(&"drive-by"));
    }

    #[test]
    fn rejected_requests_still_count_as_activity() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(0.001, 1).idle_threshold(Duration::from_secs(10));
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();

        assert!(limiter.check_request("hammering").unwrap().allowed);
        for second in 1..30 {
            clock.set_time(second as f64);
            assert!(!limiter.check_request("hammering").unwrap().allowed);
            limiter.sweep_idle_clients().unwrap();
        }
        assert!(limiter.registry().contains(&"hammering"));
    }

    #[test]
    fn evicted_client_comes_back_with_a_full_bucket() {
        let clock = TestClock::new(0.0);
        let config = LimiterConfig::new(0.01, 2).idle_threshold(Duration::from_secs(5));
        let limiter = RateLimiter::with_config(config, clock.clone()).unwrap();

        assert!(limiter.check_request("client1").unwrap().allowed);
        assert!(limiter.check_request("client1").unwrap().allowed);
        assert!(!limiter.check_request("client1").unwrap().allowed);

        clock.set_time(6.0);
        assert_eq!(limiter.sweep_idle_clients().unwrap(), 1);

        assert!(limiter.check_request("client1").unwrap().allowed);
        assert!(limiter.check_request("client1").unwrap().allowed);
    }
}
