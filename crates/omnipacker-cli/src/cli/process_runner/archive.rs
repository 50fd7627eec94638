//! Archiver stage: packs the finalized output into a `.7z`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use omnipacker_core::classify::extract_percent;
use omnipacker_core::console::Stream;
use omnipacker_core::job::redact_args;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::monitor::{spawn_line_reader, wait_or_cancel, MonitoredJob};
use super::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArchiveOutcome {
    Created,
    Failed(Option<i32>),
    Cancelled,
}

/// Arguments for a 7z-compatible archiver. A password also encrypts headers.
pub(super) fn archiver_args(source: &Path, archive: &Path, password: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = ["a", "-t7z", "-bsp1", "-bso1", "-y"]
        .into_iter()
        .map(String::from)
        .collect();
    if let Some(pw) = password.filter(|p| !p.is_empty()) {
        args.push(format!("-p{pw}"));
        args.push("-mhe=on".to_string());
    }
    args.push(archive.display().to_string());
    args.push(source.display().to_string());
    args
}

impl MonitoredJob {
    pub(super) async fn compress(&self, source: &Path, archive: &Path) -> Result<ArchiveOutcome> {
        let c = Some(&self.correlation);
        let args = archiver_args(source, archive, self.request.compression.password.as_deref());
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.set_phase(Phase::Compression, Some(cancel_tx)).await;

        self.events.status(c, "compressing", None);
        self.events.compression_status(c, "compressing", None);
        self.events.compression_log(
            c,
            Stream::System,
            format!(
                "{} {}",
                self.settings.archiver.display(),
                redact_args(&args).join(" ")
            ),
        );

        let outcome = self.run_archiver(&args, cancel_rx).await;
        self.set_phase(Phase::Finalizing, None).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.events
                    .compression_log(c, Stream::System, format!("Archiver error: {e:#}"));
                ArchiveOutcome::Failed(None)
            }
        };

        match outcome {
            ArchiveOutcome::Created => {
                self.events.compression_progress(100);
                self.events.compression_status(c, "completed", Some(0));
                if let Err(e) = tokio::fs::remove_dir_all(source).await {
                    tracing::warn!(path = %source.display(), "remove uncompressed output: {}", e);
                }
            }
            ArchiveOutcome::Failed(code) => {
                self.events.compression_status(c, "exited", code);
                remove_partial(archive).await;
            }
            ArchiveOutcome::Cancelled => {
                self.events
                    .compression_log(c, Stream::System, "Compression cancelled.");
                self.events.compression_status(c, "exited", None);
                remove_partial(archive).await;
            }
        }
        Ok(outcome)
    }

    async fn run_archiver(
        &self,
        args: &[String],
        cancel: oneshot::Receiver<()>,
    ) -> Result<ArchiveOutcome> {
        let mut child = Command::new(&self.settings.archiver)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn {}", self.settings.archiver.display()))?;

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let (events, corr) = (self.events.clone(), self.correlation.clone());
            readers.push(spawn_line_reader(stdout, move |line| {
                match extract_percent(&line) {
                    Some(pct) => events.compression_progress(pct),
                    None => events.compression_log(Some(&corr), Stream::Stdout, line),
                }
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            let (events, corr) = (self.events.clone(), self.correlation.clone());
            readers.push(spawn_line_reader(stderr, move |line| {
                events.compression_log(Some(&corr), Stream::Stderr, line)
            }));
        }

        let (exit, cancelled) = wait_or_cancel(&mut child, cancel)
            .await
            .context("wait for archiver")?;
        for reader in readers {
            let _ = reader.await;
        }

        Ok(if cancelled {
            ArchiveOutcome::Cancelled
        } else if exit.success() {
            ArchiveOutcome::Created
        } else {
            ArchiveOutcome::Failed(exit.code())
        })
    }
}

async fn remove_partial(archive: &Path) {
    let archive: PathBuf = archive.to_path_buf();
    if archive.exists() {
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            tracing::debug!(path = %archive.display(), "remove partial archive: {}", e);
        }
    }
}
