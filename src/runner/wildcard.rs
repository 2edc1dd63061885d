//! Wildcard detection and filtering.
//!
//! Runs after the resolver pool drains, in four phases: index every A answer
//! back to its hosts, select candidate hosts whose address is shared widely
//! enough, classify candidates by probing random sibling labels, then emit
//! the survivors in first-seen-address order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use rand::{distributions::Alphanumeric, Rng};

use crate::config::PROBE_LABEL_LEN;
use crate::resolve::{DnsRecord, ResolverClient};
use crate::store::HostStore;

/// Index of A address → hosts resolving to it, with first-seen address
/// order preserved for stable emission.
pub(crate) struct WildcardIndex {
    ip_hosts: HashMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

impl WildcardIndex {
    /// Phase 1: scan the store and index every A answer.
    pub(crate) fn build(store: &HostStore) -> Self {
        let mut ip_hosts: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut order = Vec::new();
        store.scan(|host, value| {
            let Ok(record) = DnsRecord::from_bytes(value) else {
                // the item has no record - ignore
                return;
            };
            for a in &record.a {
                if !ip_hosts.contains_key(a) {
                    order.push(a.clone());
                }
                ip_hosts.entry(a.clone()).or_default().insert(host.to_string());
            }
        });
        Self { ip_hosts, order }
    }

    /// Distinct A addresses in first-seen order.
    pub(crate) fn addresses(&self) -> &[String] {
        &self.order
    }

    /// Phase 2: hosts behind addresses shared by at least `threshold`
    /// hosts, de-duplicated across addresses, in first-seen-address order.
    pub(crate) fn candidates(&self, threshold: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for a in &self.order {
            let hosts = &self.ip_hosts[a];
            if hosts.len() >= threshold {
                for host in hosts {
                    if seen.insert(host.clone()) {
                        candidates.push(host.clone());
                    }
                }
            }
        }
        candidates
    }

    fn hosts_for(&self, address: &str) -> Option<&BTreeSet<String>> {
        self.ip_hosts.get(address)
    }
}

/// Phase 4 planning: walk the index in first-seen-address order and decide,
/// per host, whether it is emitted (once) or counted as removed.
///
/// The wildcard root itself always survives; any other classified wildcard
/// is dropped.
pub(crate) fn emission_plan(
    index: &WildcardIndex,
    wildcards: &HashSet<String>,
    root: &str,
) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut seen_removed = HashSet::new();
    let mut emitted = Vec::new();
    let mut num_removed = 0usize;
    for address in index.addresses() {
        let Some(hosts) = index.hosts_for(address) else {
            continue;
        };
        for host in hosts {
            if host == root || !wildcards.contains(host) {
                if seen.insert(host.clone()) {
                    emitted.push(host.clone());
                }
            } else if seen_removed.insert(host.clone()) {
                num_removed += 1;
            }
        }
    }
    (emitted, num_removed)
}

/// Phase 3 classification: whether `host`'s A answers are indistinguishable
/// from those of a random, almost-certainly-nonexistent sibling label.
///
/// Probes one random label per suffix level between the host's parent and
/// the wildcard root, memoizing each suffix's answer set so sibling hosts
/// do not repeat probes.
pub(crate) async fn is_wildcard(
    client: &ResolverClient,
    cache: &Mutex<HashMap<String, Vec<String>>>,
    host: &str,
    root: &str,
) -> bool {
    if host == root {
        return false;
    }
    let original: HashSet<String> = client.lookup_a(host).await.into_iter().collect();
    if original.is_empty() {
        return false;
    }

    for suffix in probe_suffixes(host, root) {
        let cached = { cache.lock().unwrap().get(&suffix).cloned() };
        let answers = match cached {
            Some(answers) => answers,
            None => {
                let probe = format!("{}.{}", random_label(), suffix);
                let answers = client.lookup_a(&probe).await;
                cache
                    .lock()
                    .unwrap()
                    .entry(suffix)
                    .or_insert_with(|| answers.clone());
                answers
            }
        };
        if !answers.is_empty() && original.iter().all(|ip| answers.contains(ip)) {
            return true;
        }
    }
    false
}

/// The suffixes probed for `host`: every parent between the host and the
/// wildcard root, root included. Empty when `host` is not under `root`.
fn probe_suffixes(host: &str, root: &str) -> Vec<String> {
    let mut suffixes = Vec::new();
    let mut rest = host;
    while let Some(idx) = rest.find('.') {
        rest = &rest[idx + 1..];
        suffixes.push(rest.to_string());
        if rest == root {
            break;
        }
    }
    let under_root = format!(".{}", root);
    suffixes.retain(|s| s == root || s.ends_with(&under_root));
    suffixes
}

fn random_label() -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(PROBE_LABEL_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}
