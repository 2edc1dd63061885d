//! Hybrid in-memory/on-disk host store.
//!
//! Starts as a sorted in-memory map and migrates to a temporary `sled`
//! database once the entry count crosses the spill threshold, so large
//! enumeration runs do not hold every record bundle in memory. Keys iterate
//! in sorted order in both backends, which keeps scan order deterministic
//! across runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::debug;
use tempfile::TempDir;

use crate::config::STORE_SPILL_THRESHOLD;
use crate::errors::StoreError;

enum Backend {
    Memory(BTreeMap<String, Vec<u8>>),
    Disk { db: sled::Db, _dir: TempDir },
}

/// Keyed store with set semantics, shared by the input materializer (pending
/// hosts) and the wildcard pass (host → serialized record bundle).
pub struct HostStore {
    backend: Mutex<Backend>,
    spill_threshold: usize,
}

impl HostStore {
    /// Creates a store with the default spill threshold.
    pub fn new() -> Self {
        Self::with_spill_threshold(STORE_SPILL_THRESHOLD)
    }

    /// Creates a store that spills to disk after `spill_threshold` entries.
    pub fn with_spill_threshold(spill_threshold: usize) -> Self {
        Self {
            backend: Mutex::new(Backend::Memory(BTreeMap::new())),
            spill_threshold,
        }
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Memory(map) => map.contains_key(key),
            Backend::Disk { db, .. } => matches!(db.get(key), Ok(Some(_))),
        }
    }

    /// Inserts or overwrites `key`. An empty value marks a pending host.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut backend = self.backend.lock().unwrap();
        let needs_spill = match &mut *backend {
            Backend::Memory(map) => {
                map.insert(key.to_string(), value.to_vec());
                map.len() >= self.spill_threshold
            }
            Backend::Disk { db, .. } => {
                db.insert(key, value)?;
                false
            }
        };
        if needs_spill {
            if let Backend::Memory(map) = &*backend {
                let disk = Self::spill(map)?;
                *backend = disk;
            }
        }
        Ok(())
    }

    /// Fetches the current value for `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Memory(map) => map.get(key).cloned(),
            Backend::Disk { db, .. } => db.get(key).ok().flatten().map(|v| v.to_vec()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Memory(map) => map.len(),
            Backend::Disk { db, .. } => db.len(),
        }
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes `f` once per key, in sorted order, with the key and its
    /// current value.
    ///
    /// The callback runs without the store lock held: keys are snapshotted
    /// up front and each value re-fetched per key, so concurrent `put`/`has`
    /// calls from workers never deadlock against a scan. Keys inserted after
    /// the snapshot are not visited; keys removed are skipped.
    pub fn scan<F>(&self, mut f: F)
    where
        F: FnMut(&str, &[u8]),
    {
        let keys: Vec<String> = {
            let backend = self.backend.lock().unwrap();
            match &*backend {
                Backend::Memory(map) => map.keys().cloned().collect(),
                Backend::Disk { db, .. } => db
                    .iter()
                    .keys()
                    .filter_map(|k| k.ok())
                    .filter_map(|k| String::from_utf8(k.to_vec()).ok())
                    .collect(),
            }
        };
        for key in keys {
            if let Some(value) = self.get(&key) {
                f(&key, &value);
            }
        }
    }

    /// Releases backing resources. Flushes the disk backend if one exists.
    pub fn close(&self) {
        let backend = self.backend.lock().unwrap();
        if let Backend::Disk { db, .. } = &*backend {
            if let Err(e) = db.flush() {
                debug!("host store flush on close failed: {}", e);
            }
        }
    }

    fn spill(map: &BTreeMap<String, Vec<u8>>) -> Result<Backend, StoreError> {
        let dir = tempfile::Builder::new().prefix("dnsweep-store-").tempdir()?;
        let db = sled::open(dir.path().join("hosts"))?;
        debug!(
            "host store spilling {} entries to {}",
            map.len(),
            dir.path().display()
        );
        for (k, v) in map {
            db.insert(k.as_bytes(), v.as_slice())?;
        }
        Ok(Backend::Disk { db, _dir: dir })
    }
}

impl Default for HostStore {
    fn default() -> Self {
        Self::new()
    }
}
