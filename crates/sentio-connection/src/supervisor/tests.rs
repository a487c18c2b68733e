//! Tests for backoff, retry policy and the supervisor task

use super::*;
use std::time::Duration;

mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_exponential_growth() {
        let backoff = BackoffStrategy::new(100, 30_000);

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(backoff.calculate_delay(3), Duration::from_millis(800));
        assert_eq!(backoff.calculate_delay(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_backoff_max_limit() {
        let backoff = BackoffStrategy::new(100, 1000);

        assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(20), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(3.0);

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(300));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(900));
    }

    #[test]
    fn test_backoff_with_jitter_stays_within_quarter() {
        let backoff = BackoffStrategy::new(1000, 30_000).with_jitter(true);

        for _ in 0..50 {
            let delay = backoff.calculate_delay(0);
            assert!(
                delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250),
                "Delay {:?} should be between 750ms and 1250ms",
                delay
            );
        }
    }

    #[test]
    fn test_backoff_jitter_on_tiny_delay() {
        let backoff = BackoffStrategy::new(2, 2).with_jitter(true);
        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(2));
    }

    #[test]
    fn test_backoff_clamps_inputs() {
        assert_eq!(
            BackoffStrategy::new(0, 1000).initial_delay(),
            Duration::from_millis(1)
        );
        assert_eq!(
            BackoffStrategy::new(1000, 100).max_delay(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            BackoffStrategy::new(100, 1000)
                .with_multiplier(0.5)
                .multiplier(),
            1.0
        );
    }

    #[test]
    fn test_backoff_default() {
        let backoff = BackoffStrategy::default();

        assert_eq!(backoff.initial_delay(), Duration::from_millis(500));
        assert_eq!(backoff.max_delay(), Duration::from_millis(30_000));
        assert_eq!(backoff.multiplier(), 2.0);
        assert!(!backoff.has_jitter());
    }

    #[test]
    fn test_backoff_serde_roundtrip_keeps_settings() {
        let backoff = BackoffStrategy::new(250, 8_000).with_jitter(true);
        let json = serde_json::to_string(&backoff).unwrap();
        assert!(json.contains("\"initial_ms\":250"));
        let parsed: BackoffStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, backoff);
    }
}

mod policy_tests {
    use super::*;

    #[test]
    fn test_first_retry_waits_initial_delay() {
        let policy = RetryPolicy::new(BackoffStrategy::new(100, 10_000), 5);

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_past_ceiling_stays_at_max_delay() {
        let policy = RetryPolicy::new(BackoffStrategy::new(100, 10_000), 3);

        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(1_000), Duration::from_millis(10_000));
    }

    #[test]
    fn test_zero_max_attempts_is_invalid() {
        let policy = RetryPolicy::new(BackoffStrategy::default(), 0);
        assert!(policy.validate().is_err());
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_retry_state_reset() {
        let mut state = RetryState::default();
        state.record_failure();
        state.record_failure();
        assert_eq!(state.attempts, 2);

        state.next_retry_at = Some(tokio::time::Instant::now());
        state.reset();
        assert_eq!(state.attempts, 0);
        assert!(state.next_retry_at.is_none());
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());
    }
}

mod task_tests {
    use std::sync::Arc;

    use crate::pool::{ConnectionPool, PoolStatus};
    use crate::testing::{BASE_BACKOFF_MS, MockStore, descriptor};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_idles_while_ready() {
        let store = MockStore::new();
        let pool = ConnectionPool::connect(&descriptor(2, 5), store.factory())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(store.attempts(), 2);
        assert_eq!(pool.stats().next_retry_in_ms(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_keeps_retrying_past_ceiling() {
        let store = MockStore::unreachable();
        let pool = ConnectionPool::connect(&descriptor(1, 1), store.factory())
            .await
            .unwrap();

        // 100 + 200 + 400 + 800 + 1600, then 1600 per attempt.
        tokio::time::sleep(Duration::from_millis(3_100 + 1_600 * 3 + 50)).await;
        assert_eq!(store.attempts(), 1 + 5 + 3);

        store.set_reachable(true);
        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert_eq!(pool.status(), PoolStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_pool_stops_supervisor() {
        let store = MockStore::unreachable();
        let pool = ConnectionPool::connect(&descriptor(1, 1), store.factory())
            .await
            .unwrap();
        drop(pool);

        tokio::time::sleep(Duration::from_millis(BASE_BACKOFF_MS * 10)).await;
        assert_eq!(store.attempts(), 1);
        assert_eq!(Arc::strong_count(&store), 1);
    }
}
