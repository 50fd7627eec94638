//! Runner notifications: routing, classification and status transitions.

use super::{QueueScheduler, UiEvent};
use crate::auth::{AuthAction, AuthChallengeCoordinator, EmailState, HardwareTokenState, QrState};
use crate::classify::{self, map_status, RunnerStatus, Signal};
use crate::conflict::OutputConflict;
use crate::job::{CorrelationId, JobId, JobStatus};
use crate::runner::{
    CompressionEvent, DownloadEvent, JobRunner, LogEvent, RunnerError, StatusEvent,
};

/// Where an incoming event belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// The job holding the running slot.
    Running(JobId),
    /// A known job that is no longer running; its events never change status.
    Inactive(JobId),
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Download,
    Compression,
}

impl<R: JobRunner> QueueScheduler<R> {
    pub async fn handle_download_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Log(log) => self.on_log(log, Phase::Download).await,
            DownloadEvent::Status(status) => self.on_status_signal(status).await,
            DownloadEvent::OutputConflict(conflict) => self.on_output_conflict(conflict),
        }
    }

    pub async fn handle_compression_event(&mut self, event: CompressionEvent) {
        match event {
            CompressionEvent::Log(log) => self.on_log(log, Phase::Compression).await,
            CompressionEvent::Status(status) => self.on_compression_status(status),
            CompressionEvent::Progress(percent) => {
                if let Some(id) = self.registry.running() {
                    self.apply_progress(id, percent);
                }
            }
        }
    }

    /// Prefer the job that owns the correlation id; otherwise adopt the id onto
    /// the running job if it has none yet. Untagged events go to the running job.
    fn route(&mut self, correlation: Option<&CorrelationId>) -> Route {
        let running = self.registry.running();
        let Some(correlation) = correlation else {
            return running.map(Route::Running).unwrap_or(Route::Discard);
        };
        if let Some(id) = self.registry.find_by_correlation(correlation) {
            return if Some(id) == running {
                Route::Running(id)
            } else {
                Route::Inactive(id)
            };
        }
        let Some(job) = self.registry.running_job_mut() else {
            return Route::Discard;
        };
        if !job.adopt_correlation_id(correlation.clone()) {
            return Route::Discard;
        }
        tracing::debug!(job = %job.id(), %correlation, "adopted correlation id");
        Route::Running(job.id())
    }

    /// Applies a status payload to the owning job via the status table.
    pub async fn on_status_signal(&mut self, event: StatusEvent) {
        let Some(status) = RunnerStatus::parse(&event.status, event.code) else {
            tracing::debug!(status = %event.status, "unrecognized runner status");
            return;
        };
        let id = match self.route(event.correlation_id.as_ref()) {
            Route::Running(id) => id,
            Route::Inactive(id) => {
                tracing::debug!(job = %id, status = status.as_str(), "status for inactive job ignored");
                return;
            }
            Route::Discard => {
                tracing::debug!(status = status.as_str(), "status with no owning job discarded");
                return;
            }
        };

        let message = match status.code() {
            Some(code) if matches!(status, RunnerStatus::Exited { .. }) => {
                format!("Status: {} (code {code})", status.as_str())
            }
            _ => format!("Status: {}", status.as_str()),
        };
        self.log_system(id, message);

        let next = map_status(status);
        match next {
            JobStatus::Running | JobStatus::Compressing => {
                let Some(job) = self.registry.get_mut(id) else { return };
                if job.status() != next {
                    job.set_status(next);
                    tracing::info!(job = %id, status = %next, "job status changed");
                    self.notify_job(id);
                }
            }
            JobStatus::Done | JobStatus::Failed => self.on_terminal(id, next).await,
            // The table never yields queued.
            JobStatus::Queued => {}
        }
    }

    async fn on_terminal(&mut self, id: JobId, terminal: JobStatus) {
        if let Some(job) = self.registry.get_mut(id) {
            job.set_status(terminal);
            job.auth.hardware_token = HardwareTokenState::Idle;
            job.auth.qr = QrState::Idle;
            job.auth.email = EmailState::Idle;
        }
        self.registry.set_running(None);
        let message = match terminal {
            JobStatus::Done => "Job completed.",
            _ => "Job failed.",
        };
        self.log_system(id, message);
        tracing::info!(job = %id, status = %terminal, "job finished");
        self.notify_job(id);

        if self.auth.retry_pending_for(id) {
            if let Some(job) = self.registry.get_mut(id) {
                job.reset_for_retry();
            }
            self.log_system(id, "Restarting job after rejected email code.");
            self.notify_job(id);
            // Earlier jobs cannot be queued while this one ran, so start() would pick it too.
            let restarted = self.launch(id).await;
            self.auth.finish_retry();
            if restarted.is_err() {
                self.advance().await;
            }
            return;
        }

        self.advance().await;
    }

    fn on_compression_status(&mut self, event: StatusEvent) {
        let Some(status) = RunnerStatus::parse(&event.status, event.code) else {
            tracing::debug!(status = %event.status, "unrecognized compression status");
            return;
        };
        let Route::Running(id) = self.route(event.correlation_id.as_ref()) else {
            tracing::debug!(status = status.as_str(), "compression status with no running job");
            return;
        };
        let terminal = map_status(status).is_terminal();
        if terminal {
            // The download runner reports the job's terminal state after finalizing.
            let message = match status.code() {
                Some(code) => format!("Compression {} (code {code})", status.as_str()),
                None => format!("Compression {}", status.as_str()),
            };
            self.log_system(id, message);
            return;
        }
        let Some(job) = self.registry.get_mut(id) else { return };
        if job.status() != JobStatus::Compressing {
            job.set_status(JobStatus::Compressing);
            self.log_system(id, "Status: compressing");
            self.notify_job(id);
        }
    }

    async fn on_log(&mut self, event: LogEvent, phase: Phase) {
        let id = match self.route(event.correlation_id.as_ref()) {
            Route::Running(id) => id,
            Route::Inactive(id) => {
                tracing::debug!(job = %id, line = %event.line, "late log line for inactive job discarded");
                return;
            }
            Route::Discard => {
                tracing::debug!(line = %event.line, "log line with no owning job discarded");
                return;
            }
        };
        let Some(job) = self.registry.get_mut(id) else { return };
        job.log.append(event.stream, event.line.clone());

        if phase == Phase::Compression {
            if let Some(percent) = classify::extract_percent(&event.line) {
                self.apply_progress(id, percent);
            }
            return;
        }

        let ctx = AuthChallengeCoordinator::context(job);
        let signals = classify::classify_line(&event.line, event.stream, ctx);
        if signals.is_empty() {
            tracing::trace!(job = %id, "classification miss");
        }
        for signal in signals {
            self.apply_line_signal(id, signal, &event.line).await;
        }
    }

    fn apply_progress(&mut self, id: JobId, percent: u8) {
        let updated = self
            .registry
            .get_mut(id)
            .map(|job| job.set_compression_progress(percent))
            .unwrap_or(false);
        if updated {
            self.notify_job(id);
        }
    }

    async fn apply_line_signal(&mut self, id: JobId, signal: Signal, line: &str) {
        match signal {
            Signal::Progress(percent) => self.apply_progress(id, percent),
            Signal::MissingDepotsWarning => {
                let app = self
                    .registry
                    .get(id)
                    .map(|j| j.spec.app_id.clone())
                    .unwrap_or_default();
                self.log_system(
                    id,
                    format!("No depots found for app {app}. The selected OS may not match this app."),
                );
                self.notifier.notify(UiEvent::MissingDepots { job: id });
            }
            Signal::StatusTransition(_) => {}
            auth_signal => {
                let Some(job) = self.registry.get_mut(id) else { return };
                let Some(action) = self.auth.apply(job, &auth_signal, line) else {
                    return;
                };
                self.on_auth_action(id, action).await;
            }
        }
    }

    async fn on_auth_action(&mut self, id: JobId, action: AuthAction) {
        match action {
            AuthAction::ShowQr(text) => {
                self.notifier.notify(UiEvent::QrCode { job: id, text });
            }
            AuthAction::QrLoggedIn { .. } => {
                self.log_system(id, "QR login confirmed.");
                self.notifier.notify(UiEvent::QrLoggedIn { job: id });
            }
            AuthAction::HardwareTokenPrompt => {
                self.log_system(id, "Confirm the sign-in in the Steam Mobile App.");
                self.notifier.notify(UiEvent::HardwareTokenPrompt { job: id });
            }
            AuthAction::HardwareTokenConfirmed => {
                self.notifier
                    .notify(UiEvent::HardwareTokenConfirmed { job: id });
            }
            AuthAction::EmailPrompt { provider } => {
                self.notifier
                    .notify(UiEvent::EmailCodeRequested { job: id, provider });
            }
            AuthAction::EmailCancelled => {
                self.log_system(id, "No code was provided; login cancelled.");
                self.notifier.notify(UiEvent::EmailPromptClosed { job: id });
            }
            AuthAction::RestartRequested => self.request_restart(id).await,
        }
    }

    /// Cancels the running phase so the terminal status can trigger the restart.
    async fn request_restart(&mut self, id: JobId) {
        self.log_system(id, "Email code was rejected; restarting the job.");
        self.notifier.notify(UiEvent::EmailPromptClosed { job: id });
        match self.cancel_running_phase().await {
            Ok(()) => {}
            // The process is already on its way out; its terminal status restarts the job.
            Err(RunnerError::NotRunning(phase)) => {
                tracing::debug!(job = %id, phase, "restart cancel found runner already stopping");
            }
            Err(e) => self.abort_restart(id, e),
        }
    }

    fn abort_restart(&mut self, id: JobId, e: RunnerError) {
        tracing::warn!(job = %id, "restart cancel failed: {}", e);
        self.log_system(id, format!("Restart aborted, cancel failed: {e}"));
        self.auth.finish_retry();
        if let Some(job) = self.registry.get_mut(id) {
            job.auth.email = EmailState::Idle;
        }
    }

    fn on_output_conflict(&mut self, conflict: OutputConflict) {
        let owner = self.registry.find_by_correlation(&conflict.correlation_id);
        if let Some(id) = owner {
            self.log_system(
                id,
                format!("Output already exists: {}", conflict.output_path),
            );
        }
        let presented = self.conflicts.report(conflict).cloned();
        if let Some(active) = presented {
            self.notifier.notify(UiEvent::OutputConflict(active));
        }
    }
}

