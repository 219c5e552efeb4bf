//! Integration tests for reconnection strategies
//!
//! These tests verify reconnection behavior with different strategies.

use feedsockets::traits::reconnect::{ExponentialBackoff, NeverReconnect, ReconnectionStrategy};
use std::time::Duration;

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

#[test]
fn test_feed_backoff_full_sequence() {
    verbose_println!("Testing feed backoff full sequence...");

    let strategy = ExponentialBackoff::new(
        Duration::from_secs(2),
        Duration::from_secs(60),
        Some(10),
    );

    let expected_secs = [2, 4, 8, 16, 32, 60, 60, 60, 60, 60];

    for (attempt, &expected) in expected_secs.iter().enumerate() {
        let delay = strategy.next_delay(attempt as u32).unwrap();
        verbose_println!("  Attempt {}: {:?}", attempt + 1, delay);
        assert_eq!(
            delay,
            Duration::from_secs(expected),
            "Unexpected delay at attempt {}",
            attempt + 1
        );
    }

    // The 11th retry is refused (max_attempts = 10)
    assert!(
        strategy.next_delay(10).is_none(),
        "Should return None after max attempts"
    );
    assert!(!strategy.should_reconnect(10));
}

#[test]
fn test_exponential_backoff_with_capping() {
    verbose_println!("Testing exponential backoff with capping...");

    let strategy = ExponentialBackoff::new(
        Duration::from_millis(500),
        Duration::from_secs(2),
        None,
    );

    let delays: Vec<u64> = (0..6)
        .map(|i| strategy.next_delay(i).unwrap().as_millis() as u64)
        .collect();

    verbose_println!("  Delays: {:?}", delays);

    assert_eq!(delays, vec![500, 1000, 2000, 2000, 2000, 2000]);
}

#[test]
fn test_unbounded_backoff_never_gives_up() {
    let strategy = ExponentialBackoff::new(
        Duration::from_millis(100),
        Duration::from_secs(30),
        None,
    );

    for attempt in [0, 10, 1_000, u32::MAX - 1] {
        assert!(strategy.should_reconnect(attempt));
        assert!(strategy.next_delay(attempt).unwrap() <= Duration::from_secs(30));
    }
}

#[test]
fn test_never_reconnect_always_fails() {
    verbose_println!("Testing NeverReconnect strategy...");

    let strategy = NeverReconnect;

    for attempt in 0..10 {
        assert!(
            strategy.next_delay(attempt).is_none(),
            "NeverReconnect should always return None"
        );
        assert!(
            !strategy.should_reconnect(attempt),
            "NeverReconnect should never allow reconnection"
        );
    }
}

#[test]
fn test_strategies_as_trait_objects() {
    let strategies: Vec<Box<dyn ReconnectionStrategy>> = vec![
        Box::new(ExponentialBackoff::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Some(10),
        )),
        Box::new(NeverReconnect),
    ];

    let first_delays: Vec<Option<Duration>> =
        strategies.iter().map(|s| s.next_delay(0)).collect();

    assert_eq!(first_delays, vec![Some(Duration::from_secs(2)), None]);
}
