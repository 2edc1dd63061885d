//! Input materialization.
//!
//! Normalizes heterogeneous inputs (files, inline arguments, stdin) into the
//! host stream. Batch mode de-duplicates through the host store; stream mode
//! pushes hosts straight onto the work channel as they arrive.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use log::warn;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::errors::ConfigError;
use crate::store::HostStore;

/// Whether something is piped into us.
fn has_stdin() -> bool {
    !std::io::stdin().is_terminal()
}

fn argument_has_stdin(arg: &str) -> bool {
    arg == "-"
}

/// Resolves an input argument to its contents: a readable file path, `-` (or
/// piped stdin), or the inline value itself. Commas act as line separators
/// in inline values.
async fn preprocess_argument(arg: &str) -> Result<String> {
    let data = if Path::new(arg).is_file() {
        tokio::fs::read_to_string(arg)
            .await
            .with_context(|| format!("failed to read input file {}", arg))?
    } else if argument_has_stdin(arg) {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("failed to read stdin")?;
        buffer
    } else if !arg.is_empty() {
        arg.to_string()
    } else {
        return Err(ConfigError::InputMissing.into());
    };
    Ok(data.replace(',', "\n"))
}

fn normalize_to_vec(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies the per-line materialization rules: the wordlist product wins,
/// then CIDR expansion, then the line verbatim.
pub(crate) fn expand_line(line: &str, prefixes: Option<&[String]>) -> Vec<String> {
    let item = line.trim();
    if item.is_empty() {
        return Vec::new();
    }
    if let Some(prefixes) = prefixes {
        return prefixes
            .iter()
            .map(|prefix| format!("{}.{}", prefix.trim(), item))
            .collect();
    }
    if item.contains('/') {
        if let Ok(network) = item.parse::<IpNetwork>() {
            return network.iter().map(|ip| ip.to_string()).collect();
        }
    }
    vec![item.to_string()]
}

/// Materializes the finite batch-mode host set into the store.
///
/// Returns the number of unique hosts inserted. Fails with
/// [`ConfigError::InputMissing`] when no domains, hosts, or usable stdin is
/// available.
pub async fn prepare(config: &Config, store: &HostStore) -> Result<usize> {
    let prefixes = match &config.wordlist {
        Some(wordlist) => Some(normalize_to_vec(&preprocess_argument(wordlist).await?)),
        None => None,
    };

    let data = if let Some(domains) = &config.domains {
        preprocess_argument(domains).await?
    } else if let Some(hosts) = &config.hosts {
        preprocess_argument(hosts).await?
    } else if has_stdin() {
        preprocess_argument("-").await?
    } else {
        return Err(ConfigError::InputMissing.into());
    };

    let mut num_hosts = 0usize;
    for line in data.lines() {
        for host in expand_line(line, prefixes.as_deref()) {
            // counted once, no matter how often it appears in the input
            if store.has(&host) {
                continue;
            }
            if let Err(e) = store.put(&host, b"") {
                warn!("failed to store host {}: {}", host, e);
                continue;
            }
            num_hosts += 1;
        }
    }
    Ok(num_hosts)
}

/// Stream-mode materializer: pushes hosts onto the work channel as lines
/// arrive, bypassing the store entirely.
pub async fn stream(config: &Config, tx: mpsc::Sender<String>) -> Result<()> {
    let mut file_lines = match &config.hosts {
        Some(hosts) if Path::new(hosts).is_file() => {
            let file = tokio::fs::File::open(hosts)
                .await
                .with_context(|| format!("failed to open hosts file {}", hosts))?;
            Some(BufReader::new(file).lines())
        }
        _ => None,
    };
    let mut stdin_lines = if file_lines.is_none() {
        let from_stdin = config
            .hosts
            .as_deref()
            .map(argument_has_stdin)
            .unwrap_or(false)
            || has_stdin();
        if !from_stdin {
            return Err(ConfigError::InputMissing.into());
        }
        Some(BufReader::new(tokio::io::stdin()).lines())
    } else {
        None
    };

    loop {
        let line = match (&mut file_lines, &mut stdin_lines) {
            (Some(lines), _) => lines.next_line().await,
            (None, Some(lines)) => lines.next_line().await,
            (None, None) => unreachable!("one input source is always selected"),
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("failed to read input line: {}", e);
                continue;
            }
        };
        for host in expand_line(&line, None) {
            if tx.send(host).await.is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}
