//! Resume state persistence.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Persisted resume state: how far a batch run got through the sorted host
/// scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeCfg {
    /// Index of the last host handed to the pool.
    pub index: u64,
    /// The host at that index.
    pub resume_from: String,
}

impl ResumeCfg {
    /// Loads the resume state from `path`.
    ///
    /// A missing file starts from scratch silently; a corrupt file starts
    /// from scratch with a warning.
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(
                        "corrupt resume file {}: {}; starting from scratch",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Atomically persists the resume state: written to a temporary file in
    /// the same directory, then renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("failed to create temporary resume file")?;
        let bytes = serde_json::to_vec_pretty(self).context("failed to serialize resume state")?;
        tmp.write_all(&bytes)
            .context("failed to write resume state")?;
        tmp.persist(path)
            .with_context(|| format!("failed to persist resume file {}", path.display()))?;
        Ok(())
    }
}

/// In-memory resume progress, advanced by the batch input worker.
#[derive(Debug, Default)]
pub struct ResumeProgress {
    /// Index of the host currently being handed out.
    pub index: u64,
    /// The host at that index.
    pub current: String,
    /// Index restored from disk; hosts at or below it are skipped.
    pub loaded_index: u64,
    /// Host name restored from disk, for the startup message.
    pub loaded_from: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.cfg");
        let cfg = ResumeCfg {
            index: 42,
            resume_from: "somewhere.example.com".into(),
        };
        cfg.save(&path).unwrap();
        assert_eq!(ResumeCfg::load(&path), cfg);
    }

    #[test]
    fn test_load_missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ResumeCfg::load(&dir.path().join("absent.cfg"));
        assert_eq!(cfg, ResumeCfg::default());
    }

    #[test]
    fn test_load_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.cfg");
        std::fs::write(&path, b"{ not json").unwrap();
        let cfg = ResumeCfg::load(&path);
        assert_eq!(cfg, ResumeCfg::default());
    }
}
