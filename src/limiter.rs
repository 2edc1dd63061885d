//! Process-wide query rate limiting.
//!
//! Token-bucket limiter shared by every resolver worker. Tokens are
//! replenished by a background task on a fast tick with fractional carry so
//! low rates do not suffer precision loss. Unlimited mode is represented by
//! the absence of a limiter (`None`), not by a very high rate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

/// Token-bucket rate limiter for controlling query rate.
///
/// Each query consumes a token; acquisition blocks when the bucket is empty.
/// The bucket capacity is kept small (one replenishment tick's worth) so a
/// one-second window never sees much more than the configured rate.
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
    current_rps: Arc<AtomicU32>,
}

impl RateLimiter {
    /// Takes one token, waiting until one is available.
    pub async fn acquire(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }

    /// The configured queries-per-second value.
    pub fn current_rps(&self) -> u32 {
        self.current_rps.load(Ordering::SeqCst)
    }
}

/// Initializes the token-bucket rate limiter.
///
/// Returns `None` when `rps` is 0: unlimited mode must be a zero-overhead
/// pass-through at the call sites, not a throttle with a huge rate. The
/// returned `CancellationToken` shuts down the replenishment task.
pub fn init_rate_limiter(rps: u32) -> Option<(Arc<RateLimiter>, CancellationToken)> {
    if rps == 0 {
        return None;
    }
    // one tick's worth of burst
    let capacity = std::cmp::max(1, (rps / 10) as usize);
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    let current_rps = Arc::new(AtomicU32::new(rps));
    let limiter = Arc::new(RateLimiter {
        permits: Arc::new(Semaphore::new(capacity)),
        capacity,
        current_rps: Arc::clone(&current_rps),
    });

    let permits = limiter.permits.clone();
    let capacity_for_ticker = limiter.capacity;
    let rps_for_ticker = Arc::clone(&current_rps);
    let mut ticker = interval(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut last_time = tokio::time::Instant::now();
        let mut fractional_permits = 0.0f64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = tokio::time::Instant::now();
                    let elapsed = now.duration_since(last_time);
                    let rps_value = rps_for_ticker.load(Ordering::SeqCst);

                    if rps_value > 0 {
                        let permits_to_add_f64 =
                            f64::from(rps_value) * elapsed.as_secs_f64() + fractional_permits;
                        let permits_to_add = permits_to_add_f64 as u32;
                        fractional_permits = permits_to_add_f64 - f64::from(permits_to_add);

                        if permits_to_add > 0 {
                            // never let the bucket exceed its capacity
                            let headroom =
                                capacity_for_ticker.saturating_sub(permits.available_permits());
                            let grant = std::cmp::min(permits_to_add as usize, headroom);
                            if grant > 0 {
                                permits.add_permits(grant);
                            }
                        }
                    }

                    last_time = now;
                }
                _ = shutdown_clone.cancelled() => {
                    log::debug!("rate limiter background task shutting down");
                    break;
                }
            }
        }
    });

    Some((limiter, shutdown))
}
