//! Runner that drives the downloader and archiver as child processes.
//!
//! One job at a time: `start_job` spawns the downloader in a per-job staging
//! directory and hands the child to a monitor task. Password logins first run
//! a manifest-only preflight so depot and build facts are known. The monitor
//! streams output as log events, lays the download out as a Steam library in
//! the output directory (asking about conflicts), runs the archiver and writes
//! release notes, then reports the terminal status.

mod archive;
mod finalize;
mod monitor;
mod preflight;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use omnipacker_core::conflict::ConflictChoice;
use omnipacker_core::config::OmniConfig;
use omnipacker_core::console::Stream;
use omnipacker_core::depot::ManifestScan;
use omnipacker_core::job::{redact_args, CorrelationId};
use omnipacker_core::runner::{
    generate_correlation_id, JobRunner, RunnerError, RunnerEventSender, StartRequest, StartedJob,
};
use omnipacker_core::template::TemplateRenderer;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};

/// Programs and locations the runner works with.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub downloader: PathBuf,
    pub archiver: PathBuf,
    pub output_dir: PathBuf,
    /// Saved template payload, if any.
    pub template_path: Option<PathBuf>,
    pub renderer: TemplateRenderer,
}

impl RunnerSettings {
    pub fn from_config(cfg: &OmniConfig) -> anyhow::Result<Self> {
        Ok(Self {
            downloader: cfg.runner.downloader_program(),
            archiver: cfg.runner.archiver_program(),
            output_dir: cfg.runner.resolve_output_dir()?,
            template_path: omnipacker_core::template::store::default_path().ok(),
            renderer: TemplateRenderer::from_config(&cfg.template),
        })
    }

    fn staging_dir(&self, correlation: &CorrelationId) -> PathBuf {
        self.output_dir.join(".staging").join(correlation.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Download,
    Finalizing,
    Compression,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Download => "download",
            Phase::Finalizing => "finalization",
            Phase::Compression => "compression",
        }
    }
}

pub(crate) struct ActiveJob {
    pub correlation: CorrelationId,
    pub phase: Phase,
    pub stdin: Option<ChildStdin>,
    pub cancel: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
pub(crate) struct Shared {
    pub active: Option<ActiveJob>,
    pub conflicts: HashMap<CorrelationId, oneshot::Sender<ConflictChoice>>,
}

pub(crate) type SharedState = Arc<Mutex<Shared>>;

/// Written from the blocking output readers, hence a std mutex.
pub(crate) type SharedScan = Arc<std::sync::Mutex<ManifestScan>>;

/// Program and arguments as logged, with secrets masked.
pub(crate) fn command_line(program: &Path, args: &[String]) -> String {
    format!("{} {}", program.display(), redact_args(args).join(" "))
}

pub(crate) fn spawn_downloader(
    program: &Path,
    args: &[impl AsRef<OsStr>],
    dir: &Path,
) -> std::io::Result<Child> {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

#[derive(Clone)]
pub struct ProcessRunner {
    settings: Arc<RunnerSettings>,
    events: RunnerEventSender,
    shared: SharedState,
}

impl ProcessRunner {
    pub fn new(settings: RunnerSettings, events: RunnerEventSender) -> Self {
        Self {
            settings: Arc::new(settings),
            events,
            shared: SharedState::default(),
        }
    }

    async fn cancel_phase(&self, phase: Phase) -> Result<(), RunnerError> {
        let mut shared = self.shared.lock().await;
        let active = shared
            .active
            .as_mut()
            .filter(|a| a.phase == phase)
            .ok_or(RunnerError::NotRunning(phase.name()))?;
        let cancel = active
            .cancel
            .take()
            .ok_or_else(|| RunnerError::Rejected(format!("{} is already stopping", phase.name())))?;
        let _ = cancel.send(());
        tracing::info!(correlation = %active.correlation, phase = phase.name(), "cancel sent");
        Ok(())
    }
}

impl JobRunner for ProcessRunner {
    async fn start_job(&self, request: StartRequest) -> Result<StartedJob, RunnerError> {
        let mut shared = self.shared.lock().await;
        if let Some(active) = &shared.active {
            return Err(RunnerError::Rejected(format!(
                "job {} is still active",
                active.correlation
            )));
        }

        let correlation = CorrelationId::new(generate_correlation_id());
        let staging = self.settings.staging_dir(&correlation);
        tokio::fs::create_dir_all(&staging).await?;

        let preflight = !request.credentials.qr_enabled;
        let c = Some(&correlation);
        self.events.status(c, "starting", None);

        let mut args = request.downloader_args();
        let workdir = if preflight {
            args.push(preflight::MANIFEST_ONLY_FLAG.to_string());
            let dir = staging.join(preflight::PREFLIGHT_DIR);
            tokio::fs::create_dir_all(&dir).await?;
            self.events.log(
                c,
                Stream::System,
                "Running preflight to resolve depot metadata...",
            );
            dir
        } else {
            staging.clone()
        };
        self.events.log(
            c,
            Stream::System,
            command_line(&self.settings.downloader, &args),
        );

        let mut child = match spawn_downloader(&self.settings.downloader, &args, &workdir) {
            Ok(child) => child,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(RunnerError::Unavailable(format!(
                    "{}: {e}",
                    self.settings.downloader.display()
                )));
            }
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        shared.active = Some(ActiveJob {
            correlation: correlation.clone(),
            phase: Phase::Download,
            stdin: child.stdin.take(),
            cancel: Some(cancel_tx),
        });
        drop(shared);

        let launch = if preflight {
            self.events.status(c, "resolving_metadata", None);
            monitor::Launch::Preflight
        } else {
            self.events.status(c, "running", None);
            monitor::Launch::Download
        };
        tracing::info!(%correlation, app = %request.app_id, preflight, "downloader spawned");

        let job = monitor::MonitoredJob {
            correlation: correlation.clone(),
            request,
            staging: staging.clone(),
            settings: Arc::clone(&self.settings),
            events: self.events.clone(),
            shared: Arc::clone(&self.shared),
            scan: SharedScan::default(),
        };
        tokio::spawn(job.run(child, cancel_rx, launch));

        Ok(StartedJob {
            correlation_id: correlation,
            staging_location: Some(staging.display().to_string()),
        })
    }

    async fn cancel_download(&self) -> Result<(), RunnerError> {
        self.cancel_phase(Phase::Download).await
    }

    async fn cancel_compression(&self) -> Result<(), RunnerError> {
        self.cancel_phase(Phase::Compression).await
    }

    async fn submit_email_code(&self, code: String) -> Result<(), RunnerError> {
        let mut shared = self.shared.lock().await;
        let stdin = shared
            .active
            .as_mut()
            .and_then(|a| a.stdin.as_mut())
            .ok_or(RunnerError::NotRunning("download"))?;
        stdin.write_all(code.trim().as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn resolve_conflict(
        &self,
        correlation_id: CorrelationId,
        choice: ConflictChoice,
    ) -> Result<(), RunnerError> {
        let tx = self
            .shared
            .lock()
            .await
            .conflicts
            .remove(&correlation_id)
            .ok_or_else(|| {
                RunnerError::Rejected(format!("no pending conflict for {correlation_id}"))
            })?;
        tx.send(choice)
            .map_err(|_| RunnerError::Rejected("conflict prompt is no longer pending".into()))
    }
}
