//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

/// Shuts down all background tasks gracefully.
///
/// Handles cancellation of the progress printer and the rate limiter's
/// replenishment task.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    progress_task: Option<tokio::task::JoinHandle<()>>,
    rate_limiter_shutdown: Option<CancellationToken>,
) {
    // Signal progress task to stop and await it
    cancel.cancel();
    if let Some(progress_task) = progress_task {
        let _ = progress_task.await;
    }

    // Signal rate limiter to stop if it exists
    if let Some(shutdown) = rate_limiter_shutdown {
        shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[tokio::test]
    async fn test_shutdown_gracefully_no_tasks() {
        let cancel = CancellationToken::new();
        // Should not panic when no tasks are provided
        shutdown_gracefully(cancel, None, None).await;
    }

    #[tokio::test]
    async fn test_shutdown_gracefully_with_progress_task() {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let progress_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(10));
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = cancel_clone.cancelled() => {
                        break;
                    }
                }
            }
        });

        // Should wait for the task to complete
        shutdown_gracefully(cancel, Some(progress_task), None).await;
    }

    #[tokio::test]
    async fn test_shutdown_gracefully_with_rate_limiter() {
        let cancel = CancellationToken::new();
        let rate_limiter_shutdown = CancellationToken::new();

        shutdown_gracefully(cancel, None, Some(rate_limiter_shutdown.clone())).await;

        assert!(rate_limiter_shutdown.is_cancelled());
    }
}
