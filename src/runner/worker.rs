//! Resolver pool worker.
//!
//! Each worker drains the shared work channel, applies the rate limit,
//! queries, filters, and dispatches the result to exactly one sink: the host
//! store in wildcard mode, or the output channel in every other mode.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};

use crate::resolve::{rcode_name, DnsRecord};
use crate::runner::Runner;

pub(crate) async fn resolve_worker(
    runner: Arc<Runner>,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    tx: mpsc::Sender<String>,
) {
    loop {
        let host = { rx.lock().await.recv().await };
        let Some(host) = host else {
            break;
        };
        process_host(&runner, host, &tx).await;
    }
}

async fn process_host(runner: &Runner, host: String, tx: &mpsc::Sender<String>) {
    let domain = match extract_url_host(&host) {
        Some(extracted) => extracted,
        None => host,
    };

    if let Some(limiter) = &runner.limiter {
        limiter.acquire().await;
    }

    // partial results are still good; only catastrophic failures skip the host
    let mut record = match runner.client.query_multiple(&domain).await {
        Ok(record) => record,
        Err(e) => {
            debug!("skipping {}: {}", domain, e);
            return;
        }
    };
    if record.is_discardable() {
        return;
    }

    // skip responses not having the expected response code
    if !passes_rcode_filter(&runner.rcode_filter, record.status_code) {
        return;
    }

    if !runner.config.raw {
        record.raw.clear();
    }

    if runner.config.trace {
        if let Ok(mut trace) = runner.client.trace(&domain).await {
            if runner.config.raw {
                // join the whole chain in the aggregate raw field
                for step in &mut trace.records {
                    record.raw.push_str(&step.raw);
                    record.raw.push('\n');
                    step.raw.clear();
                }
            }
            record.trace = Some(trace);
        }
    }

    dispatch_record(runner, &domain, record, tx).await;
}

/// Whether `status_code` survives the configured response-code allowlist.
pub(crate) fn passes_rcode_filter(filter: &HashSet<u16>, status_code: u16) -> bool {
    filter.is_empty() || filter.contains(&status_code)
}

/// Routes one surviving record to exactly one sink, in priority order:
/// wildcard store, JSON, raw, response-code, per-type emitters.
pub(crate) async fn dispatch_record(
    runner: &Runner,
    domain: &str,
    record: DnsRecord,
    tx: &mpsc::Sender<String>,
) {
    if runner.config.wildcard_domain.is_some() {
        match record.to_bytes() {
            Ok(bytes) => {
                if let Err(e) = runner.store.put(&record.host, &bytes) {
                    warn!("failed to store record for {}: {}", record.host, e);
                }
            }
            Err(e) => warn!("failed to serialize record for {}: {}", record.host, e),
        }
        return;
    }
    if runner.config.json {
        if let Ok(json) = record.json() {
            let _ = tx.send(json).await;
        }
        return;
    }
    if runner.config.raw {
        let _ = tx.send(record.raw).await;
        return;
    }
    if !runner.rcode_filter.is_empty() {
        if let Some(name) = rcode_name(record.status_code) {
            let _ = tx.send(format!("{} [{}]", domain, name)).await;
        }
        return;
    }
    for qtype in &runner.question_types {
        emit_record_type(
            domain,
            record.answers(*qtype),
            runner.config.response_only,
            runner.config.response,
            tx,
        )
        .await;
    }
}

/// Per-type emitter: each item alone, `domain [item]` pairs, or the domain
/// once when any item exists.
pub(crate) async fn emit_record_type(
    domain: &str,
    items: &[String],
    response_only: bool,
    response: bool,
    tx: &mpsc::Sender<String>,
) {
    for item in items {
        let item = item.to_lowercase();
        if response_only {
            let _ = tx.send(item).await;
        } else if response {
            let _ = tx.send(format!("{} [{}]", domain, item)).await;
        } else {
            // just prints out the domain if it has a record of this type
            let _ = tx.send(domain.to_string()).await;
            break;
        }
    }
}

fn extract_url_host(input: &str) -> Option<String> {
    if !input.contains("://") {
        return None;
    }
    url::Url::parse(input)
        .ok()?
        .host_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CHANNEL_CAPACITY};

    async fn collect(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    fn runner_with(config: Config) -> Arc<Runner> {
        Arc::new(Runner::new(config).unwrap())
    }

    fn record_with_a(host: &str, ips: &[&str]) -> DnsRecord {
        DnsRecord {
            a: ips.iter().map(|s| s.to_string()).collect(),
            ..DnsRecord::new(host)
        }
    }

    #[test]
    fn test_extract_url_host() {
        assert_eq!(
            extract_url_host("https://example.com/path?q=1"),
            Some("example.com".to_string())
        );
        assert_eq!(extract_url_host("example.com"), None);
    }

    #[test]
    fn test_rcode_filter_pass_through_when_empty() {
        assert!(passes_rcode_filter(&HashSet::new(), 3));
        let filter: HashSet<u16> = [3].into_iter().collect();
        assert!(passes_rcode_filter(&filter, 3));
        assert!(!passes_rcode_filter(&filter, 0));
    }

    #[tokio::test]
    async fn test_presence_only_emits_domain_once() {
        let runner = runner_with(Config::default());
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let record = record_with_a("example.com", &["93.184.216.34", "93.184.216.35"]);
        dispatch_record(&runner, "example.com", record, &tx).await;
        drop(tx);
        assert_eq!(collect(rx).await, vec!["example.com"]);
    }

    #[tokio::test]
    async fn test_response_mode_emits_pairs() {
        let runner = runner_with(Config {
            a: true,
            response: true,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let record = record_with_a("example.com", &["1.1.1.1", "2.2.2.2"]);
        dispatch_record(&runner, "example.com", record, &tx).await;
        drop(tx);
        let mut lines = collect(rx).await;
        lines.sort();
        assert_eq!(
            lines,
            vec!["example.com [1.1.1.1]", "example.com [2.2.2.2]"]
        );
    }

    #[tokio::test]
    async fn test_response_only_lowercases_items() {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        emit_record_type(
            "example.com",
            &["NS1.Example.COM.".to_string()],
            true,
            false,
            &tx,
        )
        .await;
        drop(tx);
        assert_eq!(collect(rx).await, vec!["ns1.example.com."]);
    }

    #[tokio::test]
    async fn test_rcode_mode_emits_code_name() {
        let runner = runner_with(Config {
            rcodes: vec!["NXDOMAIN".into()],
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut record = DnsRecord::new("bad.test");
        record.status_code = 3;
        dispatch_record(&runner, "bad.test", record, &tx).await;
        drop(tx);
        assert_eq!(collect(rx).await, vec!["bad.test [NXDOMAIN]"]);
    }

    #[tokio::test]
    async fn test_json_mode_emits_serialized_record() {
        let runner = runner_with(Config {
            json: true,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let record = record_with_a("example.com", &["1.1.1.1"]);
        dispatch_record(&runner, "example.com", record, &tx).await;
        drop(tx);
        let lines = collect(rx).await;
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["host"], "example.com");
    }

    #[tokio::test]
    async fn test_wildcard_mode_stores_instead_of_emitting() {
        let runner = runner_with(Config {
            wildcard_domain: Some("x.test".into()),
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let record = record_with_a("a.x.test", &["10.0.0.1"]);
        dispatch_record(&runner, "a.x.test", record, &tx).await;
        drop(tx);
        assert!(collect(rx).await.is_empty());
        let stored = runner.store.get("a.x.test").unwrap();
        let restored = DnsRecord::from_bytes(&stored).unwrap();
        assert_eq!(restored.a, vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_multiple_types_emit_independently() {
        // a host with A and CNAME answers is emitted once per enabled type
        let runner = runner_with(Config {
            a: true,
            cname: true,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut record = record_with_a("example.com", &["1.1.1.1", "2.2.2.2"]);
        record.cname.push("edge.example.net.".into());
        dispatch_record(&runner, "example.com", record, &tx).await;
        drop(tx);
        assert_eq!(collect(rx).await, vec!["example.com", "example.com"]);
    }
}
