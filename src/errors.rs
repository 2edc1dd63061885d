//! Error type definitions.
//!
//! Typed errors per subsystem; `anyhow` wraps these at the application
//! boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration errors, detected before any worker starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No domains, hosts file, or usable stdin was provided.
    #[error("hosts file or stdin not provided")]
    InputMissing,

    /// Two flags that cannot be combined were both set.
    #[error("conflicting flags: {0} cannot be combined with {1}")]
    ConflictingFlags(&'static str, &'static str),

    /// The resolver file exists but could not be read.
    #[error("failed to read resolver file {path}: {source}")]
    UnreadableResolverFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A resolver endpoint could not be parsed.
    #[error("invalid resolver endpoint: {0}")]
    InvalidResolver(String),

    /// An RCODE name in the response-code filter is not recognized.
    #[error("unknown response code: {0}")]
    UnknownRcode(String),

    /// The worker pool needs at least one worker.
    #[error("threads must be a positive integer")]
    ZeroThreads,
}

/// Errors from the hybrid host store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failure in the sled backend.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The spill directory could not be created.
    #[error("failed to create spill directory: {0}")]
    Spill(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Catastrophic resolution failure: no question type produced an answer or a
/// definitive response code.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Every endpoint failed for every question type of a name.
    #[error("all resolvers failed for {name}: {reason}")]
    AllResolversFailed {
        /// The queried name.
        name: String,
        /// The last transport error observed.
        reason: String,
    },

    /// The hosts-file override could not be read.
    #[error("failed to read hosts file {path}: {source}")]
    HostsFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitError {
    /// Error initializing the logger.
    #[error("logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),
}
