//! Enqueue, start and advance.

use super::{QueueError, QueueScheduler, UiEvent};
use crate::job::{JobId, JobSpec, JobStatus};
use crate::runner::{JobRunner, StartRequest};

impl<R: JobRunner> QueueScheduler<R> {
    /// Appends a queued job. Always succeeds.
    pub fn enqueue(&mut self, spec: JobSpec) -> JobId {
        let summary = format!("Queued app {} ({}, branch {})", spec.app_id, spec.os, spec.branch);
        let id = self.registry.add(spec);
        self.log_system(id, summary);
        tracing::info!(job = %id, "job queued");
        self.notifier.notify(UiEvent::JobAdded(id));
        id
    }

    /// Starts the first queued job in registry order. When that job fails to
    /// start, the queue moves on to the next one.
    pub async fn start(&mut self) -> Result<JobId, QueueError> {
        let result = self.start_next().await;
        if matches!(result, Err(QueueError::StartupFailed { .. })) {
            self.advance().await;
        }
        result
    }

    async fn start_next(&mut self) -> Result<JobId, QueueError> {
        if let Some(running) = self.registry.running() {
            self.notifier
                .notify(UiEvent::Advisory("A job is already running.".to_string()));
            return Err(QueueError::AlreadyRunning(running));
        }
        let id = self.registry.first_queued().ok_or(QueueError::NothingQueued)?;
        self.launch(id).await
    }

    /// Marks `id` running and hands it to the runner. A runner failure fails the job.
    pub(super) async fn launch(&mut self, id: JobId) -> Result<JobId, QueueError> {
        let job = self.registry.get_mut(id).ok_or(QueueError::UnknownJob(id))?;
        job.set_status(JobStatus::Running);
        let credentials = self.auth.credentials_for(job);
        let reused_login = job.spec.credentials.qr_enabled && !credentials.qr_enabled;
        let request = StartRequest::new(&job.spec, credentials);
        self.registry.set_running(Some(id));

        if reused_login {
            let user = request.credentials.username.clone();
            self.log_system(id, format!("Reusing QR login for {user}"));
        }
        self.log_system(
            id,
            format!("Starting download for app {} ({})", request.app_id, request.os),
        );
        self.notify_job(id);

        match self.runner.start_job(request).await {
            Ok(started) => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.adopt_correlation_id(started.correlation_id.clone());
                    if let Some(staging) = started.staging_location {
                        job.set_staging_location(staging);
                    }
                }
                tracing::info!(job = %id, correlation = %started.correlation_id, "job started");
                Ok(id)
            }
            Err(e) => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.set_status(JobStatus::Failed);
                }
                self.registry.set_running(None);
                self.log_system(id, format!("Failed to start: {e}"));
                tracing::warn!(job = %id, "start failed: {}", e);
                self.notify_job(id);
                Err(QueueError::StartupFailed { job: id, source: e })
            }
        }
    }

    /// After a terminal transition: start the next queued job, skipping past
    /// jobs that fail to start, or mark the queue idle.
    pub(super) async fn advance(&mut self) {
        loop {
            if self.registry.running().is_some() {
                return;
            }
            if !self.registry.has_queued() {
                self.check_idle();
                return;
            }
            match self.start_next().await {
                Ok(_) => return,
                Err(QueueError::StartupFailed { .. }) => continue,
                Err(e) => {
                    tracing::debug!("advance stopped: {}", e);
                    return;
                }
            }
        }
    }
}
