//! Tests for query rate pacing.

use std::time::{Duration, Instant};

use dnsweep::limiter::init_rate_limiter;

#[test]
fn test_zero_rate_means_no_limiter() {
    // unlimited mode is the absence of a limiter, not a huge rate
    assert!(init_rate_limiter(0).is_none());
}

#[tokio::test]
async fn test_one_second_window_stays_near_the_configured_rate() {
    let rps = 50u32;
    let (limiter, shutdown) = init_rate_limiter(rps).unwrap();

    let start = Instant::now();
    let mut acquired_in_first_second = 0u32;
    while start.elapsed() < Duration::from_secs(1) {
        tokio::select! {
            _ = limiter.acquire() => {
                acquired_in_first_second += 1;
            }
            _ = tokio::time::sleep_until(tokio::time::Instant::now() + Duration::from_millis(5)) => {}
        }
    }

    shutdown.cancel();
    // allow slack for the initial burst and window boundaries
    assert!(
        acquired_in_first_second <= rps + rps / 5 + 1,
        "acquired {} tokens in one second at {} qps",
        acquired_in_first_second,
        rps
    );
}

#[tokio::test]
async fn test_tokens_keep_flowing() {
    let (limiter, shutdown) = init_rate_limiter(100).unwrap();
    let start = Instant::now();
    for _ in 0..20 {
        limiter.acquire().await;
    }
    // 20 tokens at 100 qps should comfortably finish within a few hundred ms
    assert!(start.elapsed() < Duration::from_secs(2));
    shutdown.cancel();
}
