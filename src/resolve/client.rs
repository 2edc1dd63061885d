//! Retryable DNS client over a pool of upstream resolvers.
//!
//! One `hickory` resolver is built per configured endpoint; retries rotate
//! across endpoints through an atomic cursor so a flaky upstream does not
//! starve a question type. `NoRecordsFound` is a definitive answer and is
//! never retried.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::lookup::Lookup;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::config::{QuestionType, DEFAULT_RESOLVERS, DEFAULT_RETRIES, DNS_TIMEOUT_SECS};
use crate::errors::ClientError;
use crate::resolve::endpoint::ResolverEndpoint;
use crate::resolve::record::{DnsRecord, TraceData};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Upstream endpoints; empty selects the built-in defaults.
    pub base_resolvers: Vec<ResolverEndpoint>,
    /// Resolver rotations per question type before that type is failed.
    pub max_retries: usize,
    /// Question types asked for every host.
    pub question_types: Vec<QuestionType>,
    /// Optional hosts-file override consulted before any upstream query.
    pub hosts_file: Option<std::path::PathBuf>,
    /// Bound on trace recursion depth.
    pub trace_max_recursion: usize,
    /// Per-query timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            base_resolvers: Vec::new(),
            max_retries: DEFAULT_RETRIES,
            question_types: vec![QuestionType::A],
            hosts_file: None,
            trace_max_recursion: crate::config::DEFAULT_TRACE_MAX_RECURSION,
            timeout_secs: DNS_TIMEOUT_SECS,
        }
    }
}

enum LookupOutcome {
    Answers(Lookup),
    NoRecords(u16),
}

/// Retryable DNS client with endpoint rotation and a hosts-file override.
pub struct ResolverClient {
    resolvers: Vec<TokioAsyncResolver>,
    rotation: AtomicUsize,
    overrides: HashMap<String, Vec<IpAddr>>,
    options: ResolverOptions,
}

impl ResolverClient {
    /// Builds a client, one resolver per endpoint.
    pub fn new(options: ResolverOptions) -> Result<Self, ClientError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(options.timeout_secs);
        // rotation handles retries, so each resolver gets a single attempt
        opts.attempts = 1;
        // prevent search-domain appending
        opts.ndots = 0;

        let endpoints: Vec<ResolverEndpoint> = if options.base_resolvers.is_empty() {
            DEFAULT_RESOLVERS
                .iter()
                .filter_map(|s| ResolverEndpoint::from_str(s).ok())
                .collect()
        } else {
            options.base_resolvers.clone()
        };

        let resolvers = endpoints
            .iter()
            .map(|ep| {
                let mut group = NameServerConfigGroup::with_capacity(1);
                group.push(NameServerConfig::new(ep.addr, ep.protocol));
                TokioAsyncResolver::tokio(
                    ResolverConfig::from_parts(None, vec![], group),
                    opts.clone(),
                )
            })
            .collect();

        let overrides = match &options.hosts_file {
            Some(path) => parse_hosts_file(path)?,
            None => HashMap::new(),
        };

        Ok(Self {
            resolvers,
            rotation: AtomicUsize::new(0),
            overrides,
            options,
        })
    }

    /// The client configuration.
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolves `name` for every configured question type and returns the
    /// union of answers.
    ///
    /// Partial failure is tolerated: types that fail after all rotations are
    /// skipped while successful types contribute their answers. An error is
    /// returned only when no type produced answers or a definitive response
    /// code.
    pub async fn query_multiple(&self, name: &str) -> Result<DnsRecord, ClientError> {
        let host = normalize_name(name);
        let mut record = DnsRecord::new(host.clone());

        if let Some(ips) = self.overrides.get(&host) {
            for ip in ips {
                match ip {
                    IpAddr::V4(v4) => record.a.push(v4.to_string()),
                    IpAddr::V6(v6) => record.aaaa.push(v6.to_string()),
                }
            }
            return Ok(record);
        }

        let mut definitive = false;
        let mut last_error = String::new();
        for qtype in &self.options.question_types {
            match self.lookup_with_rotation(&host, record_type(*qtype)).await {
                Ok(LookupOutcome::Answers(lookup)) => {
                    definitive = true;
                    collect_answers(&mut record, *qtype, &lookup);
                    append_raw(&mut record.raw, &lookup);
                }
                Ok(LookupOutcome::NoRecords(rcode)) => {
                    definitive = true;
                    record.status_code = rcode;
                }
                Err(e) => {
                    debug!("lookup {} {} failed: {}", host, qtype, e);
                    last_error = e.to_string();
                }
            }
        }

        if !definitive {
            return Err(ClientError::AllResolversFailed {
                name: host,
                reason: last_error,
            });
        }
        Ok(record)
    }

    /// Performs a single A lookup, used by the wildcard prober.
    pub async fn lookup_a(&self, name: &str) -> Vec<String> {
        let host = normalize_name(name);
        match self.lookup_with_rotation(&host, RecordType::A).await {
            Ok(LookupOutcome::Answers(lookup)) => lookup
                .iter()
                .filter_map(|rdata| {
                    if let RData::A(ip) = rdata {
                        Some(ip.to_string())
                    } else {
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Walks the NS delegation chain from the TLD down to `name`, bounded by
    /// the configured recursion limit, and returns one bundle per suffix.
    pub async fn trace(&self, name: &str) -> Result<TraceData, ClientError> {
        let host = normalize_name(name);
        let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
        let depth = labels.len().min(self.options.trace_max_recursion);

        let mut records = Vec::with_capacity(depth);
        for level in 1..=depth {
            let suffix = labels[labels.len() - level..].join(".");
            let mut step = DnsRecord::new(suffix.clone());
            match self.lookup_with_rotation(&suffix, RecordType::NS).await {
                Ok(LookupOutcome::Answers(lookup)) => {
                    collect_answers(&mut step, QuestionType::Ns, &lookup);
                    append_raw(&mut step.raw, &lookup);
                }
                Ok(LookupOutcome::NoRecords(rcode)) => step.status_code = rcode,
                Err(e) => {
                    debug!("trace step {} failed: {}", suffix, e);
                    continue;
                }
            }
            records.push(step);
        }
        Ok(TraceData { records })
    }

    async fn lookup_with_rotation(
        &self,
        name: &str,
        qtype: RecordType,
    ) -> Result<LookupOutcome, ResolveError> {
        if self.resolvers.is_empty() {
            return Err(ResolveError::from("no upstream resolvers configured"));
        }
        let fqdn = format!("{}.", name);
        let mut last_error = None;
        for _ in 0..=self.options.max_retries {
            let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % self.resolvers.len();
            match self.resolvers[idx].lookup(fqdn.as_str(), qtype).await {
                Ok(lookup) => return Ok(LookupOutcome::Answers(lookup)),
                Err(e) => {
                    if let ResolveErrorKind::NoRecordsFound { response_code, .. } = e.kind() {
                        return Ok(LookupOutcome::NoRecords(rcode_value(*response_code)));
                    }
                    debug!("resolver {} failed for {} {}: {}", idx, name, qtype, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ResolveError::from("retries exhausted")))
    }
}

/// Lowercases and strips the trailing dot from a queried name.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

fn record_type(qtype: QuestionType) -> RecordType {
    match qtype {
        QuestionType::A => RecordType::A,
        QuestionType::Aaaa => RecordType::AAAA,
        QuestionType::Cname => RecordType::CNAME,
        QuestionType::Ptr => RecordType::PTR,
        QuestionType::Mx => RecordType::MX,
        QuestionType::Ns => RecordType::NS,
        QuestionType::Soa => RecordType::SOA,
        QuestionType::Txt => RecordType::TXT,
    }
}

fn collect_answers(record: &mut DnsRecord, qtype: QuestionType, lookup: &Lookup) {
    for rdata in lookup.iter() {
        match (qtype, rdata) {
            (QuestionType::A, RData::A(ip)) => record.a.push(ip.to_string()),
            (QuestionType::Aaaa, RData::AAAA(ip)) => record.aaaa.push(ip.to_string()),
            (QuestionType::Cname, RData::CNAME(name)) => record.cname.push(name.to_utf8()),
            (QuestionType::Ptr, RData::PTR(name)) => record.ptr.push(name.to_utf8()),
            (QuestionType::Mx, RData::MX(mx)) => record.mx.push(mx.exchange().to_utf8()),
            (QuestionType::Ns, RData::NS(ns)) => record.ns.push(ns.to_utf8()),
            (QuestionType::Soa, RData::SOA(soa)) => record.soa.push(format!(
                "{} {}",
                soa.mname().to_utf8(),
                soa.rname().to_utf8()
            )),
            (QuestionType::Txt, RData::TXT(txt)) => {
                // TXT records can be split across multiple byte slices, join them
                let parts: Result<Vec<String>, _> = txt
                    .iter()
                    .map(|bytes| String::from_utf8(bytes.to_vec()))
                    .collect();
                if let Ok(parts) = parts {
                    record.txt.push(parts.join(""));
                }
            }
            _ => {}
        }
    }
}

fn append_raw(raw: &mut String, lookup: &Lookup) {
    for r in lookup.records() {
        if let Some(data) = r.data() {
            raw.push_str(&format!(
                "{}\t{}\tIN\t{}\t{}\n",
                r.name(),
                r.ttl(),
                r.record_type(),
                data
            ));
        }
    }
}

fn rcode_value(code: ResponseCode) -> u16 {
    match code {
        ResponseCode::NoError => 0,
        ResponseCode::FormErr => 1,
        ResponseCode::ServFail => 2,
        ResponseCode::NXDomain => 3,
        ResponseCode::NotImp => 4,
        ResponseCode::Refused => 5,
        ResponseCode::YXDomain => 6,
        ResponseCode::YXRRSet => 7,
        ResponseCode::NXRRSet => 8,
        ResponseCode::NotAuth => 9,
        ResponseCode::NotZone => 10,
        ResponseCode::BADVERS => 16,
        ResponseCode::BADSIG => 16,
        ResponseCode::BADKEY => 17,
        ResponseCode::BADTIME => 18,
        ResponseCode::BADMODE => 19,
        ResponseCode::BADNAME => 20,
        ResponseCode::BADALG => 21,
        ResponseCode::BADTRUNC => 22,
        ResponseCode::BADCOOKIE => 23,
        ResponseCode::Unknown(c) => c,
        _ => 0,
    }
}

fn parse_hosts_file(path: &Path) -> Result<HashMap<String, Vec<IpAddr>>, ClientError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ClientError::HostsFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut map: HashMap<String, Vec<IpAddr>> = HashMap::new();
    for line in contents.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(ip) = fields.next().and_then(|f| IpAddr::from_str(f).ok()) else {
            continue;
        };
        for name in fields {
            map.entry(normalize_name(name)).or_default().push(ip);
        }
    }
    Ok(map)
}
