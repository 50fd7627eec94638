//! Manifest-only downloader run that precedes the download proper.

use anyhow::{Context, Result};
use tokio::process::Child;
use tokio::sync::oneshot;

use super::monitor::{wait_or_cancel, MonitoredJob};
use super::{command_line, spawn_downloader};

pub(super) const MANIFEST_ONLY_FLAG: &str = "-manifest-only";
/// Under the staging dir; removed once the preflight exits.
pub(super) const PREFLIGHT_DIR: &str = ".preflight";

pub(super) enum PreflightEnd {
    Finished,
    Cancelled(Option<i32>),
}

impl MonitoredJob {
    /// A failed preflight is logged and the download still runs; only a
    /// cancel stops the job here.
    pub(super) async fn run_preflight(
        &self,
        mut child: Child,
        cancel: oneshot::Receiver<()>,
    ) -> Result<PreflightEnd> {
        let readers = self.spawn_download_readers(&mut child);
        let (exit, cancelled) = wait_or_cancel(&mut child, cancel)
            .await
            .context("wait for preflight")?;
        for reader in readers {
            let _ = reader.await;
        }

        let dir = self.staging.join(PREFLIGHT_DIR);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::debug!(path = %dir.display(), "preflight cleanup: {}", e);
        }

        if cancelled {
            self.system("Preflight cancelled.");
            return Ok(PreflightEnd::Cancelled(exit.code()));
        }
        let found = self.summary().depots.len();
        if exit.code() != Some(0) && found == 0 {
            self.system(format!(
                "Preflight failed with exit code {}. Continuing without preflight.",
                exit.code().map_or_else(|| "none".to_string(), |c| c.to_string())
            ));
        }
        tracing::debug!(correlation = %self.correlation, depots = found, "preflight finished");
        Ok(PreflightEnd::Finished)
    }

    /// Spawns the real download in the staging dir and swaps it into the
    /// active slot. `None` means a cancel arrived between the two runs.
    pub(super) async fn start_download(&self) -> Result<Option<(Child, oneshot::Receiver<()>)>> {
        let mut shared = self.shared.lock().await;
        let Some(active) = shared
            .active
            .as_mut()
            .filter(|a| a.correlation == self.correlation)
        else {
            return Ok(None);
        };
        if active.cancel.is_none() {
            return Ok(None);
        }

        let args = self.request.downloader_args();
        let mut child = spawn_downloader(&self.settings.downloader, &args, &self.staging)
            .with_context(|| format!("spawn {}", self.settings.downloader.display()))?;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        active.cancel = Some(cancel_tx);
        active.stdin = child.stdin.take();
        drop(shared);

        self.system("Starting downloader...");
        self.system(command_line(&self.settings.downloader, &args));
        self.status("running", None);
        Ok(Some((child, cancel_rx)))
    }
}
