//! Per-job task: wait on the downloader, finalize, compress, report.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use omnipacker_core::conflict::{ConflictChoice, OutputConflict};
use omnipacker_core::console::Stream;
use omnipacker_core::depot::{self, JobMetadataFile, ManifestSummary};
use omnipacker_core::job::CorrelationId;
use omnipacker_core::runner::{RunnerEventSender, StartRequest};
use omnipacker_core::template;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::archive::ArchiveOutcome;
use super::finalize;
use super::preflight::PreflightEnd;
use super::{Phase, RunnerSettings, SharedScan, SharedState};

pub(crate) struct MonitoredJob {
    pub correlation: CorrelationId,
    pub request: StartRequest,
    pub staging: PathBuf,
    pub settings: Arc<RunnerSettings>,
    pub events: RunnerEventSender,
    pub shared: SharedState,
    /// Fed by every downloader line, preflight included.
    pub scan: SharedScan,
}

/// Which downloader run the spawned child is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Launch {
    /// `-manifest-only`; the download proper follows.
    Preflight,
    Download,
}

enum Outcome {
    Completed(PathBuf),
    Exited(Option<i32>),
    FinalizationFailed(String),
}

struct Destination {
    output: PathBuf,
    archive: PathBuf,
}

impl MonitoredJob {
    pub async fn run(self, child: Child, cancel: oneshot::Receiver<()>, launch: Launch) {
        let outcome = self.drive(child, cancel, launch).await;

        if self.staging.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&self.staging).await {
                tracing::debug!(path = %self.staging.display(), "staging cleanup: {}", e);
            }
        }
        // Free the slot before reporting, so the next start is accepted.
        {
            let mut shared = self.shared.lock().await;
            if shared.active.as_ref().map(|a| &a.correlation) == Some(&self.correlation) {
                shared.active = None;
            }
            shared.conflicts.remove(&self.correlation);
        }

        match outcome {
            Ok(Outcome::Completed(path)) => {
                self.system(format!("Job complete. Output: {}", path.display()));
                self.status("completed", Some(0));
            }
            Ok(Outcome::Exited(code)) => self.status("exited", code),
            Ok(Outcome::FinalizationFailed(message)) => {
                self.system(format!("Finalization failed: {message}"));
                self.status("finalization_failed", None);
            }
            Err(e) => {
                tracing::warn!(correlation = %self.correlation, "job error: {:#}", e);
                self.system(format!("Runner error: {e:#}"));
                self.status("error", None);
            }
        }
    }

    async fn drive(
        &self,
        child: Child,
        cancel: oneshot::Receiver<()>,
        launch: Launch,
    ) -> Result<Outcome> {
        let (mut child, cancel) = match launch {
            Launch::Download => (child, cancel),
            Launch::Preflight => {
                if let PreflightEnd::Cancelled(code) = self.run_preflight(child, cancel).await? {
                    return Ok(Outcome::Exited(code));
                }
                match self.start_download().await? {
                    Some(next) => next,
                    None => {
                        self.system("Download cancelled.");
                        return Ok(Outcome::Exited(None));
                    }
                }
            }
        };

        let readers = self.spawn_download_readers(&mut child);
        let (exit, cancelled) = wait_or_cancel(&mut child, cancel)
            .await
            .context("wait for downloader")?;
        for reader in readers {
            let _ = reader.await;
        }
        self.set_phase(Phase::Finalizing, None).await;

        if cancelled {
            self.system("Download cancelled.");
            return Ok(Outcome::Exited(exit.code()));
        }
        if exit.code() != Some(0) {
            self.system("Downloader failed. Cleaning up staging directory.");
            return Ok(Outcome::Exited(exit.code()));
        }

        self.system("Download completed successfully. Finalizing output...");
        self.status("finalizing", None);
        let metadata = self.resolve_metadata()?;

        let Some(dest) = self.resolve_destination().await? else {
            return Ok(Outcome::FinalizationFailed(
                "output already exists; job cancelled by user".to_string(),
            ));
        };
        let building = self
            .settings
            .output_dir
            .join(format!(".tmp_{}", self.correlation));
        let built = finalize::remove_existing(&building)
            .and_then(|()| finalize::build_library(&self.staging, &building, &metadata))
            .and_then(|acf| {
                finalize::move_into_place(&building, &dest.output)?;
                Ok(acf)
            });
        match built {
            Ok(acf) => {
                let name = acf.file_name().map(|n| n.to_string_lossy().into_owned());
                self.system(format!("App manifest written: {}", name.unwrap_or_default()));
            }
            Err(e) => {
                if let Err(cleanup) = finalize::remove_existing(&building) {
                    tracing::debug!("partial output cleanup: {:#}", cleanup);
                }
                return Ok(Outcome::FinalizationFailed(format!(
                    "build {}: {e:#}",
                    dest.output.display()
                )));
            }
        }
        self.system(format!("Finalization complete. Output: {}", dest.output.display()));

        let mut final_path = dest.output.clone();
        if self.request.compression.skip {
            self.system("Compression skipped.");
        } else {
            match self.compress(&dest.output, &dest.archive).await? {
                ArchiveOutcome::Created => final_path = dest.archive.clone(),
                ArchiveOutcome::Failed(code) => self.system(format!(
                    "Compression failed (code {}). Uncompressed output available.",
                    code.map_or_else(|| "none".to_string(), |c| c.to_string())
                )),
                ArchiveOutcome::Cancelled => {
                    self.system("Compression cancelled. Uncompressed output available.");
                    return Ok(Outcome::Exited(None));
                }
            }
        }

        self.write_release_notes(&final_path, &metadata);
        Ok(Outcome::Completed(final_path))
    }

    /// Streams the downloader's output as log events and into the manifest scan.
    pub(super) fn spawn_download_readers(&self, child: &mut Child) -> Vec<JoinHandle<()>> {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, self.download_sink(Stream::Stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, self.download_sink(Stream::Stderr)));
        }
        readers
    }

    fn download_sink(&self, stream: Stream) -> impl FnMut(String) + Send + 'static {
        let (events, c, scan) = (
            self.events.clone(),
            self.correlation.clone(),
            Arc::clone(&self.scan),
        );
        move |line| {
            if let Ok(mut scan) = scan.lock() {
                scan.observe(&line);
            }
            events.log(Some(&c), stream, line)
        }
    }

    pub(super) fn summary(&self) -> ManifestSummary {
        self.scan
            .lock()
            .map(|scan| scan.summary())
            .unwrap_or_default()
    }

    /// Builds `job.json` from the scanned output and the staged depots. A file
    /// that cannot be written is logged; the job carries on.
    fn resolve_metadata(&self) -> Result<JobMetadataFile> {
        let staged = depot::staged_depots(&self.staging).context("read downloaded depots")?;
        let metadata = JobMetadataFile::resolve(
            self.correlation.as_str(),
            &self.request,
            &self.summary(),
            &staged,
            chrono::Utc::now(),
        );
        if let Err(e) = metadata.write_to_dir(&self.staging) {
            tracing::warn!(correlation = %self.correlation, "job metadata: {:#}", e);
            self.system(format!("Failed to write job metadata: {e:#}"));
        }
        self.system(format!(
            "Metadata resolved: build {}, {} depot(s).",
            metadata.build_id,
            metadata.depots.len()
        ));
        Ok(metadata)
    }

    /// Picks the final output path, asking the user when it already exists.
    /// `None` means the user declined to replace or copy.
    async fn resolve_destination(&self) -> Result<Option<Destination>> {
        let base = self
            .settings
            .output_dir
            .join(finalize::output_name(&self.request));
        let compress = !self.request.compression.skip;
        let archive = finalize::archive_path(&base);

        let existing = if base.exists() {
            base.clone()
        } else if compress && archive.exists() {
            archive.clone()
        } else {
            return Ok(Some(Destination { output: base, archive }));
        };

        let (tx, rx) = oneshot::channel();
        self.shared
            .lock()
            .await
            .conflicts
            .insert(self.correlation.clone(), tx);
        let output_name = existing
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.events.output_conflict(OutputConflict {
            correlation_id: self.correlation.clone(),
            output_name,
            output_path: existing.display().to_string(),
        });

        // A dropped prompt counts as a refusal.
        let choice = rx.await.unwrap_or(ConflictChoice::Cancel);
        self.system(format!("Output conflict resolved: {choice}"));
        match choice {
            ConflictChoice::Overwrite => {
                finalize::remove_existing(&base)?;
                if compress {
                    finalize::remove_existing(&archive)?;
                }
                Ok(Some(Destination { output: base, archive }))
            }
            ConflictChoice::Copy => {
                let output = finalize::copy_candidate(&base, compress)
                    .ok_or_else(|| anyhow!("no free copy name for {}", base.display()))?;
                let archive = finalize::archive_path(&output);
                Ok(Some(Destination { output, archive }))
            }
            ConflictChoice::Cancel => Ok(None),
        }
    }

    fn write_release_notes(&self, final_path: &Path, metadata: &JobMetadataFile) {
        let blocks = match &self.settings.template_path {
            Some(path) => match template::store::load_or_default(path) {
                Ok(payload) => payload.blocks,
                Err(e) => {
                    self.system(format!("Failed to load template ({e:#}); using the default."));
                    template::create_default_template()
                }
            },
            None => template::create_default_template(),
        };
        let metadata = metadata.template_metadata();
        match template::write_release_notes(&self.settings.renderer, final_path, &metadata, &blocks) {
            Ok(path) => self.system(format!("Release notes written: {}", path.display())),
            Err(e) => self.system(format!("Failed to generate release notes: {e}")),
        }
    }

    /// Updates the active phase; `cancel` replaces the phase's cancel handle.
    pub(super) async fn set_phase(&self, phase: Phase, cancel: Option<oneshot::Sender<()>>) {
        let mut shared = self.shared.lock().await;
        if let Some(active) = shared
            .active
            .as_mut()
            .filter(|a| a.correlation == self.correlation)
        {
            active.phase = phase;
            active.cancel = cancel;
            if phase != Phase::Download {
                active.stdin = None;
            }
        }
    }

    pub(super) fn system(&self, message: impl Into<String>) {
        self.events.log(Some(&self.correlation), Stream::System, message);
    }

    pub(super) fn status(&self, status: &str, code: Option<i32>) {
        self.events.status(Some(&self.correlation), status, code);
    }
}

/// Waits for `child` to exit; a cancel signal kills it first.
pub(super) async fn wait_or_cancel(
    child: &mut Child,
    cancel: oneshot::Receiver<()>,
) -> std::io::Result<(ExitStatus, bool)> {
    tokio::select! {
        status = child.wait() => return Ok((status?, false)),
        Ok(()) = cancel => {}
    }
    child.kill().await?;
    Ok((child.wait().await?, true))
}

/// Reads `reader` to EOF, handing each line to `sink`. Lines end at `\n`, `\r`
/// or backspace, since progress output rewrites a single terminal line.
pub(super) fn spawn_line_reader<R>(
    mut reader: R,
    mut sink: impl FnMut(String) + Send + 'static,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let mut splitter = LineSplitter::default();
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => splitter.push(&buf[..n]).into_iter().for_each(&mut sink),
                Err(e) => {
                    tracing::debug!("output reader stopped: {}", e);
                    break;
                }
            }
        }
        if let Some(rest) = splitter.finish() {
            sink(rest);
        }
    })
}

#[derive(Debug, Default)]
pub(super) struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if matches!(b, b'\n' | b'\r' | 0x08) {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(b);
            }
        }
        if self.holds_input_prompt() {
            lines.extend(self.take());
        }
        lines
    }

    /// The downloader asks for the email code without a trailing newline and then
    /// blocks on stdin, so a complete prompt is released as its own line.
    fn holds_input_prompt(&self) -> bool {
        let text = String::from_utf8_lossy(&self.pending).to_lowercase();
        let Some(at) = text.find("steam guard") else {
            return false;
        };
        let rest = &text[at..];
        rest.contains("email") && rest.trim_end().ends_with(':')
    }

    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
