//! Progress statistics printing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::STATS_INTERVAL_SECS;

/// Atomic counters behind the `--stats` progress printer.
pub struct ScanStats {
    /// Unique hosts materialized for this run.
    pub hosts: AtomicUsize,
    /// Queries issued so far.
    pub requests: AtomicUsize,
    /// Expected total queries (hosts × question types).
    pub total: AtomicUsize,
    started: Instant,
}

impl ScanStats {
    /// Fresh counters, stamped with the current time.
    pub fn new() -> Self {
        Self {
            hosts: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// One progress line in the
    /// `[duration] | Hosts: n | RPS: r | Requests: a/b (p%)` format.
    pub fn format_progress(&self) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let hosts = self.hosts.load(Ordering::SeqCst);
        let requests = self.requests.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);

        let rps = if elapsed > 0.0 {
            (requests as f64 / elapsed) as u64
        } else {
            0
        };
        let percent = if total > 0 {
            (requests as f64 / total as f64 * 100.0) as u64
        } else {
            0
        };

        format!(
            "[{}] | Hosts: {} | RPS: {} | Requests: {}/{} ({}%)",
            format_duration(elapsed as u64),
            hosts,
            rps,
            requests,
            total,
            percent
        )
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Spawns the periodic progress printer.
///
/// Writes one progress line to stderr every statistics interval until the
/// token is cancelled.
pub fn spawn_progress_printer(
    stats: Arc<ScanStats>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(STATS_INTERVAL_SECS));
        // the first tick completes immediately; skip it so the first line
        // carries real numbers
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    eprintln!("{}", stats.format_progress());
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }
    })
}
