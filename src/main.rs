use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use dnsweep::app::init_logger_with;
use dnsweep::config::{
    DEFAULT_RETRIES, DEFAULT_THREADS, DEFAULT_TRACE_MAX_RECURSION, DEFAULT_WILDCARD_THRESHOLD,
};
use dnsweep::{Config, LogFormat, LogLevel, Runner};

/// Bulk DNS resolution and enumeration engine.
#[derive(Parser, Debug)]
#[command(name = "dnsweep", version, about, long_about = None)]
struct Opt {
    /// Hosts to resolve: file path, inline comma-separated value, or - for stdin
    #[arg(short = 'l', long = "list")]
    hosts: Option<String>,

    /// Base domains, combined with the wordlist: file path, inline value, or -
    #[arg(short = 'd', long = "domain")]
    domains: Option<String>,

    /// Wordlist of prefix labels: file path, inline value, or -
    #[arg(short = 'w', long = "wordlist")]
    wordlist: Option<String>,

    /// Upstream resolvers: comma-separated endpoints or a file path
    #[arg(short = 'r', long = "resolver")]
    resolvers: Option<String>,

    /// Hosts-file override consulted before any upstream query
    #[arg(long = "hosts-file")]
    hosts_file: Option<PathBuf>,

    /// Resolver rotations per question type before giving up
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: usize,

    /// Number of concurrent resolver workers
    #[arg(short = 't', long, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Queries per second (0 = unlimited)
    #[arg(long = "rate-limit", default_value_t = 0)]
    rate_limit: u32,

    /// Query A records
    #[arg(long)]
    a: bool,

    /// Query AAAA records
    #[arg(long)]
    aaaa: bool,

    /// Query CNAME records
    #[arg(long)]
    cname: bool,

    /// Query PTR records
    #[arg(long)]
    ptr: bool,

    /// Query SOA records
    #[arg(long)]
    soa: bool,

    /// Query TXT records
    #[arg(long)]
    txt: bool,

    /// Query MX records
    #[arg(long)]
    mx: bool,

    /// Query NS records
    #[arg(long)]
    ns: bool,

    /// Emit each record bundle as JSON
    #[arg(long)]
    json: bool,

    /// Emit the raw response text
    #[arg(long)]
    raw: bool,

    /// Emit `domain [answer]` pairs
    #[arg(long = "resp")]
    response: bool,

    /// Emit answers alone
    #[arg(long = "resp-only")]
    response_only: bool,

    /// Keep only responses with these RCODE names (comma-separated)
    #[arg(long = "rcode", value_delimiter = ',')]
    rcodes: Vec<String>,

    /// Capture the recursion chain for each resolved host
    #[arg(long)]
    trace: bool,

    /// Bound on trace recursion depth
    #[arg(long = "trace-max-recursion", default_value_t = DEFAULT_TRACE_MAX_RECURSION)]
    trace_max_recursion: usize,

    /// Enable wildcard filtering rooted at this domain
    #[arg(long = "wildcard-domain")]
    wildcard_domain: Option<String>,

    /// Minimum shared-A multiplicity for wildcard candidates
    #[arg(long = "wildcard-threshold", default_value_t = DEFAULT_WILDCARD_THRESHOLD)]
    wildcard_threshold: usize,

    /// Append results to this file
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,

    /// Seconds between output-file flushes (negative disables)
    #[arg(long = "flush-interval", default_value_t = 5, allow_hyphen_values = true)]
    flush_interval: i64,

    /// Resolve hosts as they arrive, without de-duplication or resume
    #[arg(long)]
    stream: bool,

    /// Resume a previous run from its saved position
    #[arg(long)]
    resume: bool,

    /// Print progress statistics to stderr
    #[arg(long = "stats")]
    show_statistics: bool,

    /// Log level
    #[arg(long = "log-level", value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format
    #[arg(long = "log-format", value_enum, default_value = "plain")]
    log_format: LogFormat,
}

impl Opt {
    fn into_config(self) -> Config {
        Config {
            hosts: self.hosts,
            domains: self.domains,
            wordlist: self.wordlist,
            resolvers: self.resolvers,
            hosts_file: self.hosts_file,
            retries: self.retries,
            threads: self.threads,
            rate_limit: self.rate_limit,
            a: self.a,
            aaaa: self.aaaa,
            cname: self.cname,
            ptr: self.ptr,
            soa: self.soa,
            txt: self.txt,
            mx: self.mx,
            ns: self.ns,
            json: self.json,
            raw: self.raw,
            response: self.response,
            response_only: self.response_only,
            rcodes: self.rcodes,
            trace: self.trace,
            trace_max_recursion: self.trace_max_recursion,
            wildcard_domain: self.wildcard_domain,
            wildcard_threshold: self.wildcard_threshold,
            output_file: self.output_file,
            flush_interval: self.flush_interval,
            stream: self.stream,
            resume: self.resume,
            show_statistics: self.show_statistics,
            log_level: self.log_level,
            log_format: self.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let config = opt.into_config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let resume_capable = !config.stream;
    let runner = Arc::new(Runner::new(config).context("Failed to initialize runner")?);

    // save the resume point on interrupt, then bail
    let signal_runner = Arc::clone(&runner);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if resume_capable {
                if let Err(e) = signal_runner.save_resume_config() {
                    error!("failed to save resume state: {}", e);
                }
            }
            signal_runner.close();
            std::process::exit(1);
        }
    });

    let result = Arc::clone(&runner).run().await;
    runner.close();
    result
}
