//! Output stage.
//!
//! Single consumer over the result channel. Every message goes to stdout;
//! when an output file is configured it is opened append-only behind a
//! buffered writer with an optional periodic flusher. File write errors are
//! fatal (the operator has lost results); stdout errors are ignored.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Duration;

pub(crate) async fn handle_output(
    mut rx: mpsc::Receiver<String>,
    output_file: Option<PathBuf>,
    flush_interval: i64,
) -> Result<()> {
    let mut writer = match &output_file {
        Some(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("failed to open output file {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let mut ticker = if writer.is_some() && flush_interval > 0 {
        Some(tokio::time::interval(Duration::from_secs(
            flush_interval as u64,
        )))
    } else {
        None
    };

    loop {
        let item = match &mut ticker {
            Some(ticker) => {
                tokio::select! {
                    item = rx.recv() => item,
                    _ = ticker.tick() => {
                        if let Some(writer) = &mut writer {
                            writer.flush().context("failed to flush output file")?;
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };
        let Some(item) = item else {
            break;
        };

        if let Some(writer) = &mut writer {
            writeln!(writer, "{}", item).context("failed to write to output file")?;
            if flush_interval == 0 {
                writer.flush().context("failed to flush output file")?;
            }
        }
        // stdout mirror, errors ignored
        let _ = writeln!(std::io::stdout(), "{}", item);
    }

    if let Some(writer) = &mut writer {
        writer.flush().context("failed to flush output file")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CHANNEL_CAPACITY;

    #[tokio::test]
    async fn test_writes_lines_and_flushes_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(handle_output(rx, Some(path.clone()), -1));

        tx.send("one.test".to_string()).await.unwrap();
        tx.send("two.test".to_string()).await.unwrap();
        drop(tx);
        handle.await.unwrap().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "one.test\ntwo.test\n");
    }

    #[tokio::test]
    async fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old.test\n").unwrap();

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(handle_output(rx, Some(path.clone()), -1));
        tx.send("new.test".to_string()).await.unwrap();
        drop(tx);
        handle.await.unwrap().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "old.test\nnew.test\n");
    }

    #[tokio::test]
    async fn test_restartable_consumer() {
        // the wildcard pass restarts the stage with a fresh channel
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        for host in ["first.test", "second.test"] {
            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            let handle = tokio::spawn(handle_output(rx, Some(path.clone()), -1));
            tx.send(host.to_string()).await.unwrap();
            drop(tx);
            handle.await.unwrap().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first.test\nsecond.test\n");
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let (tx, rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let handle = tokio::spawn(handle_output(
            rx,
            Some(PathBuf::from("/nonexistent-dir/out.txt")),
            -1,
        ));
        drop(tx);
        assert!(handle.await.unwrap().is_err());
    }
}
