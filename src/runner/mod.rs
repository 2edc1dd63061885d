//! Run orchestration.
//!
//! Wires the input materializer, the resolver pool, the output stage, and
//! the wildcard filter together around the host store and the shared
//! channels. Channel ownership follows one rule: every channel is closed by
//! its single producer side going away.

mod output;
mod resume;
mod wildcard;
mod worker;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::app::{shutdown_gracefully, spawn_progress_printer, ScanStats};
use crate::config::{Config, QuestionType, CHANNEL_CAPACITY, DNS_TIMEOUT_SECS, RESUME_FILE};
use crate::input;
use crate::limiter::{init_rate_limiter, RateLimiter};
use crate::resolve::{load_resolvers, ResolverClient, ResolverOptions};
use crate::store::HostStore;

pub use resume::ResumeCfg;
use resume::ResumeProgress;

/// A configured enumeration run.
pub struct Runner {
    pub(crate) config: Config,
    pub(crate) client: ResolverClient,
    pub(crate) store: HostStore,
    pub(crate) limiter: Option<Arc<RateLimiter>>,
    limiter_shutdown: Option<CancellationToken>,
    stats: Option<Arc<ScanStats>>,
    pub(crate) rcode_filter: HashSet<u16>,
    pub(crate) question_types: Vec<QuestionType>,
    wildcards: RwLock<HashSet<String>>,
    wildcard_cache: StdMutex<HashMap<String, Vec<String>>>,
    resume_progress: StdMutex<ResumeProgress>,
}

impl Runner {
    /// Validates the configuration and builds the run: resolver client,
    /// host store, rate limiter, statistics, and restored resume state.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let question_types = config.question_types();
        let rcode_filter = config.rcode_filter()?;

        let base_resolvers = match &config.resolvers {
            Some(arg) => load_resolvers(arg)?,
            None => Vec::new(),
        };
        let client = ResolverClient::new(ResolverOptions {
            base_resolvers,
            max_retries: config.retries,
            question_types: question_types.clone(),
            hosts_file: config.hosts_file.clone(),
            trace_max_recursion: config.trace_max_recursion,
            timeout_secs: DNS_TIMEOUT_SECS,
        })
        .context("failed to initialize DNS client")?;

        let (limiter, limiter_shutdown) = match init_rate_limiter(config.rate_limit) {
            Some((limiter, shutdown)) => (Some(limiter), Some(shutdown)),
            None => (None, None),
        };

        let stats = config.show_statistics.then(|| Arc::new(ScanStats::new()));

        let mut progress = ResumeProgress::default();
        if config.resume {
            let restored = ResumeCfg::load(Path::new(RESUME_FILE));
            progress.loaded_index = restored.index;
            progress.loaded_from = restored.resume_from;
        }

        Ok(Self {
            config,
            client,
            store: HostStore::new(),
            limiter,
            limiter_shutdown,
            stats,
            rcode_filter,
            question_types,
            wildcards: RwLock::new(HashSet::new()),
            wildcard_cache: StdMutex::new(HashMap::new()),
            resume_progress: StdMutex::new(ResumeProgress::default()),
        }
        .with_progress(progress))
    }

    fn with_progress(self, progress: ResumeProgress) -> Self {
        *self.resume_progress.lock().unwrap() = progress;
        self
    }

    /// Runs the enumeration to completion.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        if self.config.stream {
            self.run_stream().await
        } else {
            self.run_batch().await
        }
    }

    async fn run_batch(self: Arc<Self>) -> Result<()> {
        let num_hosts = input::prepare(&self.config, &self.store).await?;
        debug!("materialized {} unique hosts", num_hosts);

        let cancel = CancellationToken::new();
        let progress_task = self.stats.as_ref().map(|stats| {
            stats
                .hosts
                .store(num_hosts, std::sync::atomic::Ordering::SeqCst);
            stats.total.store(
                num_hosts * self.question_types.len(),
                std::sync::atomic::Ordering::SeqCst,
            );
            spawn_progress_printer(Arc::clone(stats), cancel.child_token())
        });

        {
            let progress = self.resume_progress.lock().unwrap();
            if progress.loaded_index > 0 {
                debug!(
                    "Resuming scan using file {}. Restarting at position {}: {}",
                    RESUME_FILE, progress.loaded_index, progress.loaded_from
                );
            }
        }

        let (output_tx, output_handle) = self.start_output_worker();

        let (work_tx, work_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let input_runner = Arc::clone(&self);
        let input_handle = tokio::spawn(async move {
            input_runner.input_worker(work_tx).await;
        });

        let mut workers = Vec::with_capacity(self.config.threads);
        for _ in 0..self.config.threads {
            workers.push(tokio::spawn(worker::resolve_worker(
                Arc::clone(&self),
                Arc::clone(&work_rx),
                output_tx.clone(),
            )));
        }
        drop(output_tx);

        input_handle.await.context("input worker panicked")?;
        for joined in futures::future::join_all(workers).await {
            joined.context("resolver worker panicked")?;
        }
        shutdown_gracefully(cancel, progress_task, None).await;

        // the last worker dropped its sender; the output stage drains and exits
        output_handle.await.context("output worker panicked")??;

        if self.config.wildcard_domain.is_some() {
            Arc::clone(&self).run_wildcard_pass().await?;
        }

        if self.config.resume {
            // a completed run invalidates the resume point
            let _ = std::fs::remove_file(RESUME_FILE);
        }
        Ok(())
    }

    async fn run_stream(self: Arc<Self>) -> Result<()> {
        let (output_tx, output_handle) = self.start_output_worker();

        let (work_tx, work_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let stream_config = self.config.clone();
        let input_handle = tokio::spawn(async move {
            if let Err(e) = input::stream(&stream_config, work_tx).await {
                error!("stream input failed: {}", e);
            }
        });

        let mut workers = Vec::with_capacity(self.config.threads);
        for _ in 0..self.config.threads {
            workers.push(tokio::spawn(worker::resolve_worker(
                Arc::clone(&self),
                Arc::clone(&work_rx),
                output_tx.clone(),
            )));
        }
        drop(output_tx);

        input_handle.await.context("input worker panicked")?;
        for joined in futures::future::join_all(workers).await {
            joined.context("resolver worker panicked")?;
        }
        output_handle.await.context("output worker panicked")??;
        Ok(())
    }

    /// Batch input worker: replays the store scan into the work channel,
    /// skipping hosts at or below the restored resume index.
    async fn input_worker(self: Arc<Self>, tx: mpsc::Sender<String>) {
        let mut keys = Vec::new();
        self.store.scan(|key, _| keys.push(key.to_string()));

        for key in keys {
            if let Some(stats) = &self.stats {
                stats
                    .requests
                    .fetch_add(self.question_types.len(), std::sync::atomic::Ordering::SeqCst);
            }
            let skip = {
                let mut progress = self.resume_progress.lock().unwrap();
                progress.current = key.clone();
                progress.index += 1;
                progress.index <= progress.loaded_index
            };
            if skip {
                continue;
            }
            if tx.send(key).await.is_err() {
                break;
            }
        }
    }

    /// The four wildcard phases (index, candidate selection,
    /// classification, emission), run after the resolver pool has drained.
    async fn run_wildcard_pass(self: Arc<Self>) -> Result<()> {
        let root = self
            .config
            .wildcard_domain
            .clone()
            .expect("wildcard pass requires a wildcard domain");
        info!("Starting to filter wildcard subdomains");

        let index = wildcard::WildcardIndex::build(&self.store);
        let candidates = index.candidates(self.config.wildcard_threshold);

        let worker_count = self.config.threads.min(index.addresses().len());
        if worker_count > 0 && !candidates.is_empty() {
            let (wc_tx, wc_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
            let wc_rx = Arc::new(Mutex::new(wc_rx));

            let mut workers = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let runner = Arc::clone(&self);
                let rx = Arc::clone(&wc_rx);
                let root = root.clone();
                workers.push(tokio::spawn(async move {
                    loop {
                        let host = { rx.lock().await.recv().await };
                        let Some(host) = host else {
                            break;
                        };
                        if wildcard::is_wildcard(
                            &runner.client,
                            &runner.wildcard_cache,
                            &host,
                            &root,
                        )
                        .await
                        {
                            // mark this host as a wildcard subdomain
                            runner.wildcards.write().unwrap().insert(host);
                        }
                    }
                }));
            }

            for host in candidates {
                if wc_tx.send(host).await.is_err() {
                    break;
                }
            }
            drop(wc_tx);
            for joined in futures::future::join_all(workers).await {
                joined.context("wildcard worker panicked")?;
            }
        }

        // we need to restart the output stage for the final emission
        let (output_tx, output_handle) = self.start_output_worker();
        let (emitted, num_removed) = {
            // phase 3 workers have joined; the set is stable now
            let wildcards = self.wildcards.read().unwrap();
            wildcard::emission_plan(&index, &wildcards, &root)
        };
        for line in emitted {
            if output_tx.send(line).await.is_err() {
                break;
            }
        }
        drop(output_tx);
        output_handle.await.context("output worker panicked")??;

        info!("{} wildcard subdomains removed", num_removed);
        Ok(())
    }

    fn start_output_worker(
        &self,
    ) -> (
        mpsc::Sender<String>,
        tokio::task::JoinHandle<Result<()>>,
    ) {
        let (tx, rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let handle = tokio::spawn(output::handle_output(
            rx,
            self.config.output_file.clone(),
            self.config.flush_interval,
        ));
        (tx, handle)
    }

    /// Persists the current resume position.
    pub fn save_resume_config(&self) -> Result<()> {
        let progress = self.resume_progress.lock().unwrap();
        ResumeCfg {
            index: progress.index,
            resume_from: progress.current.clone(),
        }
        .save(Path::new(RESUME_FILE))
    }

    /// Releases backing resources.
    pub fn close(&self) {
        self.store.close();
        if let Some(shutdown) = &self.limiter_shutdown {
            shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = Config {
            stream: true,
            resume: true,
            ..Default::default()
        };
        assert!(Runner::new(config).is_err());
    }

    #[tokio::test]
    async fn test_new_applies_question_type_defaults() {
        let runner = Runner::new(Config::default()).unwrap();
        assert_eq!(runner.question_types, vec![QuestionType::A]);
    }

    #[tokio::test]
    async fn test_input_worker_skips_resumed_prefix() {
        let runner = Arc::new(Runner::new(Config::default()).unwrap());
        for host in ["a.test", "b.test", "c.test"] {
            runner.store.put(host, b"").unwrap();
        }
        {
            let mut progress = runner.resume_progress.lock().unwrap();
            progress.loaded_index = 2;
        }

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        Arc::clone(&runner).input_worker(tx).await;

        let mut handed_out = Vec::new();
        while let Some(host) = rx.recv().await {
            handed_out.push(host);
        }
        // sorted scan order: a, b are skipped, only c is handed out
        assert_eq!(handed_out, vec!["c.test"]);
        assert_eq!(runner.resume_progress.lock().unwrap().index, 3);
    }

    #[tokio::test]
    async fn test_input_worker_counts_requests() {
        let runner = Arc::new(
            Runner::new(Config {
                show_statistics: true,
                ..Default::default()
            })
            .unwrap(),
        );
        for host in ["a.test", "b.test"] {
            runner.store.put(host, b"").unwrap();
        }
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        Arc::clone(&runner).input_worker(tx).await;
        while rx.recv().await.is_some() {}

        let stats = runner.stats.as_ref().unwrap();
        // one question type per host by default
        assert_eq!(
            stats.requests.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }
}
