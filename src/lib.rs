//! dnsweep library: bulk DNS resolution and enumeration.
//!
//! This library materializes a candidate-host stream (hostnames, CIDR
//! ranges, wordlist×domain products), resolves it concurrently through a
//! pool of upstream resolvers with rate limiting and retry rotation, filters
//! the results, detects and removes DNS wildcards, and emits the survivors.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dnsweep::{Config, Runner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config {
//!     hosts: Some("hosts.txt".into()),
//!     threads: 50,
//!     rate_limit: 100,
//!     ..Default::default()
//! };
//!
//! let runner = Arc::new(Runner::new(config)?);
//! Arc::clone(&runner).run().await?;
//! runner.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod errors;
pub mod input;
pub mod limiter;
pub mod resolve;
pub mod runner;
pub mod store;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, QuestionType};
pub use resolve::{DnsRecord, ResolverClient, ResolverOptions, TraceData};
pub use runner::{ResumeCfg, Runner};
pub use store::HostStore;
