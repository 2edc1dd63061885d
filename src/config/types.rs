//! Configuration types.
//!
//! This module defines the library configuration struct and the enums used by
//! the command-line layer. The struct carries no CLI dependencies beyond the
//! `ValueEnum` derives on the logging enums.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::ValueEnum;
use strum_macros::{Display as DisplayMacro, EnumIter as EnumIterMacro};

use crate::config::constants::{
    DEFAULT_RETRIES, DEFAULT_THREADS, DEFAULT_TRACE_MAX_RECURSION, DEFAULT_WILDCARD_THRESHOLD,
};
use crate::errors::ConfigError;
use crate::resolve::rcode_from_name;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// A DNS question type the engine can ask for.
///
/// Variant order is the canonical emission order of the per-type output pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DisplayMacro, EnumIterMacro)]
#[strum(serialize_all = "UPPERCASE")]
pub enum QuestionType {
    /// Address records
    A,
    /// IPv6 address records
    Aaaa,
    /// Canonical name records
    Cname,
    /// Reverse-lookup pointer records
    Ptr,
    /// Mail exchange records
    Mx,
    /// Nameserver records
    Ns,
    /// Start-of-authority records
    Soa,
    /// Text records
    Txt,
}

/// Library configuration (no CLI dependencies).
///
/// Constructed programmatically or from the command-line layer; validated by
/// [`Config::validate`] before a run starts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosts input: file path, `-` for stdin, or an inline comma-separated value
    pub hosts: Option<String>,

    /// Domains input, combined with the wordlist when one is configured
    pub domains: Option<String>,

    /// Wordlist input: prefix labels for the wordlist×domain product
    pub wordlist: Option<String>,

    /// Upstream resolvers: comma-separated endpoints or a file path
    pub resolvers: Option<String>,

    /// Hosts-file override consulted before any upstream query
    pub hosts_file: Option<PathBuf>,

    /// Resolver rotations per question type before giving up
    pub retries: usize,

    /// Resolver-pool size
    pub threads: usize,

    /// Queries per second across the whole process; 0 means unlimited
    pub rate_limit: u32,

    /// Question-type switches
    pub a: bool,
    /// AAAA records
    pub aaaa: bool,
    /// CNAME records
    pub cname: bool,
    /// PTR records
    pub ptr: bool,
    /// SOA records
    pub soa: bool,
    /// TXT records
    pub txt: bool,
    /// MX records
    pub mx: bool,
    /// NS records
    pub ns: bool,

    /// Emit the full record bundle as JSON
    pub json: bool,

    /// Emit the raw response text
    pub raw: bool,

    /// Emit `domain [item]` per answer
    pub response: bool,

    /// Emit each answer item alone
    pub response_only: bool,

    /// Response-code filter: RCODE names to keep (empty keeps everything)
    pub rcodes: Vec<String>,

    /// Capture the recursion chain for each resolved host
    pub trace: bool,

    /// Bound on trace recursion depth
    pub trace_max_recursion: usize,

    /// Enables wildcard filtering rooted at this domain
    pub wildcard_domain: Option<String>,

    /// Minimum shared-A multiplicity for wildcard candidate selection
    pub wildcard_threshold: usize,

    /// Append-only output target
    pub output_file: Option<PathBuf>,

    /// Seconds between output-file flushes; negative disables the flusher
    pub flush_interval: i64,

    /// Stream mode: resolve hosts as they arrive, without the store
    pub stream: bool,

    /// Load the resume file and skip already-processed hosts
    pub resume: bool,

    /// Print progress statistics to stderr
    pub show_statistics: bool,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: None,
            domains: None,
            wordlist: None,
            resolvers: None,
            hosts_file: None,
            retries: DEFAULT_RETRIES,
            threads: DEFAULT_THREADS,
            rate_limit: 0,
            a: false,
            aaaa: false,
            cname: false,
            ptr: false,
            soa: false,
            txt: false,
            mx: false,
            ns: false,
            json: false,
            raw: false,
            response: false,
            response_only: false,
            rcodes: Vec::new(),
            trace: false,
            trace_max_recursion: DEFAULT_TRACE_MAX_RECURSION,
            wildcard_domain: None,
            wildcard_threshold: DEFAULT_WILDCARD_THRESHOLD,
            output_file: None,
            flush_interval: 5,
            stream: false,
            resume: false,
            show_statistics: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

impl Config {
    /// The effective question types, in canonical emission order.
    ///
    /// Falls back to `{A}` when no switch is set or when wildcard filtering is
    /// enabled (the wildcard pass only reasons about A records).
    pub fn question_types(&self) -> Vec<QuestionType> {
        let mut types = Vec::new();
        if self.a {
            types.push(QuestionType::A);
        }
        if self.aaaa {
            types.push(QuestionType::Aaaa);
        }
        if self.cname {
            types.push(QuestionType::Cname);
        }
        if self.ptr {
            types.push(QuestionType::Ptr);
        }
        if self.mx {
            types.push(QuestionType::Mx);
        }
        if self.ns {
            types.push(QuestionType::Ns);
        }
        if self.soa {
            types.push(QuestionType::Soa);
        }
        if self.txt {
            types.push(QuestionType::Txt);
        }
        if types.is_empty() || self.wildcard_domain.is_some() {
            if !types.contains(&QuestionType::A) {
                types.insert(0, QuestionType::A);
            }
        }
        types
    }

    /// The response-code allowlist as numeric codes.
    pub fn rcode_filter(&self) -> Result<HashSet<u16>, ConfigError> {
        self.rcodes
            .iter()
            .map(|name| {
                rcode_from_name(name).ok_or_else(|| ConfigError::UnknownRcode(name.clone()))
            })
            .collect()
    }

    /// Validates flag combinations before any worker starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.stream {
            if self.resume {
                return Err(ConfigError::ConflictingFlags("stream", "resume"));
            }
            if self.wildcard_domain.is_some() {
                return Err(ConfigError::ConflictingFlags("stream", "wildcard-domain"));
            }
            if self.wordlist.is_some() {
                return Err(ConfigError::ConflictingFlags("stream", "wordlist"));
            }
            if self.domains.is_some() {
                return Err(ConfigError::ConflictingFlags("stream", "domain"));
            }
        }
        // surface unknown RCODE names before startup
        self.rcode_filter()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_types_default_to_a() {
        let config = Config::default();
        assert_eq!(config.question_types(), vec![QuestionType::A]);
    }

    #[test]
    fn test_question_types_canonical_order() {
        let config = Config {
            txt: true,
            cname: true,
            a: true,
            ..Default::default()
        };
        assert_eq!(
            config.question_types(),
            vec![QuestionType::A, QuestionType::Cname, QuestionType::Txt]
        );
    }

    #[test]
    fn test_wildcard_mode_forces_a() {
        let config = Config {
            cname: true,
            wildcard_domain: Some("example.com".into()),
            ..Default::default()
        };
        let types = config.question_types();
        assert_eq!(types[0], QuestionType::A);
        assert!(types.contains(&QuestionType::Cname));
    }

    #[test]
    fn test_question_type_display() {
        assert_eq!(QuestionType::A.to_string(), "A");
        assert_eq!(QuestionType::Aaaa.to_string(), "AAAA");
        assert_eq!(QuestionType::Cname.to_string(), "CNAME");
    }

    #[test]
    fn test_stream_conflicts() {
        let config = Config {
            stream: true,
            resume: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingFlags("stream", "resume"))
        ));

        let config = Config {
            stream: true,
            wildcard_domain: Some("example.com".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rcode_filter_rejects_unknown_names() {
        let config = Config {
            rcodes: vec!["NXDOMAIN".into(), "BOGUS".into()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownRcode(_))
        ));
    }

    #[test]
    fn test_rcode_filter_parses_names() {
        let config = Config {
            rcodes: vec!["noerror".into(), "SERVFAIL".into()],
            ..Default::default()
        };
        let filter = config.rcode_filter().unwrap();
        assert!(filter.contains(&0));
        assert!(filter.contains(&2));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = Config {
            threads: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreads)));
    }
}
