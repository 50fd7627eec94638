//! User-initiated queue operations.

use std::time::Instant;

use super::{QueueError, QueueScheduler, UiEvent};
use crate::auth::EmailState;
use crate::conflict::ConflictChoice;
use crate::job::{JobId, JobStatus};
use crate::runner::{JobRunner, RunnerError};

impl<R: JobRunner> QueueScheduler<R> {
    /// Cancels whichever phase the running job is in. The runner reports the
    /// resulting terminal status through the status channel.
    pub async fn cancel(&mut self) -> Result<(), QueueError> {
        let id = self.registry.running().ok_or(QueueError::NotRunning)?;
        match self.cancel_running_phase().await {
            Ok(()) => {
                self.log_system(id, "Cancel requested.");
                tracing::info!(job = %id, "cancel requested");
                Ok(())
            }
            Err(e) => {
                self.log_system(id, format!("Cancel failed: {e}"));
                tracing::warn!(job = %id, "cancel failed: {}", e);
                Err(QueueError::Runner(e))
            }
        }
    }

    pub(super) async fn cancel_running_phase(&mut self) -> Result<(), RunnerError> {
        let compressing = self
            .registry
            .running_job()
            .map(|job| job.status() == JobStatus::Compressing)
            .ok_or(RunnerError::NotRunning("job"))?;
        if compressing {
            self.runner.cancel_compression().await
        } else {
            self.runner.cancel_download().await
        }
    }

    /// Forwards an email confirmation code for the running job's open prompt.
    pub async fn submit_email_code(&mut self, code: &str) -> Result<(), QueueError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(QueueError::EmptyCode);
        }
        let job = self.registry.running_job().ok_or(QueueError::NotRunning)?;
        if !job.auth.email_pending() {
            return Err(QueueError::NoPendingEmailPrompt);
        }
        let id = job.id();
        match self.runner.submit_email_code(code.to_string()).await {
            Ok(()) => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.auth.email = EmailState::Idle;
                }
                self.log_system(id, "Email code submitted.");
                self.notifier.notify(UiEvent::EmailPromptClosed { job: id });
                Ok(())
            }
            Err(e) => {
                self.log_system(id, format!("Failed to submit email code: {e}"));
                Err(QueueError::Runner(e))
            }
        }
    }

    /// Answers the conflict at the head of the queue; the next one, if any, is presented.
    pub async fn resolve_conflict(&mut self, choice: ConflictChoice) -> Result<(), QueueError> {
        let conflict = self
            .conflicts
            .take_active()
            .ok_or(QueueError::NoPendingConflict)?;
        let owner = self.registry.find_by_correlation(&conflict.correlation_id);
        match self
            .runner
            .resolve_conflict(conflict.correlation_id.clone(), choice)
            .await
        {
            Ok(()) => {
                if let Some(id) = owner {
                    self.log_system(
                        id,
                        format!("Output conflict for {}: {}", conflict.output_name, choice),
                    );
                }
                tracing::info!(output = %conflict.output_name, %choice, "conflict resolved");
                if let Some(next) = self.conflicts.advance().cloned() {
                    self.notifier.notify(UiEvent::OutputConflict(next));
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(output = %conflict.output_name, "conflict resolution failed: {}", e);
                self.conflicts.restore(conflict);
                Err(QueueError::Runner(e))
            }
        }
    }

    /// Moves a job by `delta` positions. Rejected while the queue is running.
    pub fn reorder(&mut self, id: JobId, delta: isize) -> bool {
        if self.is_running() {
            return false;
        }
        let moved = self.registry.move_by(id, delta);
        if moved {
            self.notify_job(id);
        }
        moved
    }

    /// Removes one job. Rejected while the queue is running.
    pub fn remove(&mut self, id: JobId) -> bool {
        if self.is_running() {
            return false;
        }
        if self.registry.remove(id).is_none() {
            return false;
        }
        tracing::info!(job = %id, "job removed");
        self.notifier.notify(UiEvent::JobRemoved(id));
        if let Some(selected) = self.registry.selected() {
            self.notifier.notify(UiEvent::Selected(selected));
        }
        self.check_idle();
        true
    }

    pub fn clear(&mut self) -> Result<(), QueueError> {
        if self.is_running() {
            self.notifier.notify(UiEvent::Advisory(
                "Cannot clear the queue while a job is running.".to_string(),
            ));
            return Err(QueueError::QueueBusy);
        }
        self.registry.clear();
        self.auth.on_queue_idle();
        tracing::info!("queue cleared");
        self.notifier.notify(UiEvent::QueueCleared);
        Ok(())
    }

    /// Selecting a job re-renders its whole console.
    pub fn select(&mut self, id: JobId) -> bool {
        if !self.registry.select(id) {
            return false;
        }
        if let Some(job) = self.registry.get_mut(id) {
            job.log.request_full_render();
        }
        self.notifier.notify(UiEvent::Selected(id));
        true
    }

    /// Emits pending console updates for every job whose flush is due.
    pub fn flush_console(&mut self, now: Instant) -> usize {
        let notifier = &self.notifier;
        let mut flushed = 0;
        for job in self.registry.iter_mut() {
            if !job.log.flush_due(now) {
                continue;
            }
            if let Some(flush) = job.log.flush(now) {
                notifier.notify(UiEvent::Console { job: job.id(), flush });
                flushed += 1;
            }
        }
        flushed
    }
}
