//! Single-concurrency queue scheduler.
//!
//! `QueueScheduler` is the one orchestrator context: it owns the registry,
//! the session auth state and the conflict queue, and is driven by the
//! control loop in [`run`]. At most one job holds the running slot; a
//! terminal job releases it and the next queued job is started.

mod control;
mod error;
mod events;
mod run;
mod start;

#[cfg(test)]
mod tests;

pub use error::QueueError;
pub use run::Command;

use tokio::sync::mpsc;

use crate::auth::AuthChallengeCoordinator;
use crate::config::ConsoleConfig;
use crate::conflict::{OutputConflict, OutputConflictResolver};
use crate::console::{ConsoleFlush, Stream};
use crate::job::{JobId, JobRegistry, JobStatus};

/// Notifications for whatever renders the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    JobAdded(JobId),
    JobUpdated { job: JobId, status: JobStatus, progress: Option<u8> },
    JobRemoved(JobId),
    QueueCleared,
    QueueIdle,
    Selected(JobId),
    Console { job: JobId, flush: ConsoleFlush },
    QrCode { job: JobId, text: String },
    QrLoggedIn { job: JobId },
    HardwareTokenPrompt { job: JobId },
    HardwareTokenConfirmed { job: JobId },
    EmailCodeRequested { job: JobId, provider: Option<String> },
    EmailPromptClosed { job: JobId },
    MissingDepots { job: JobId },
    OutputConflict(OutputConflict),
    /// Single user-facing message for a rejected queue-level request.
    Advisory(String),
}

/// Optional sink for [`UiEvent`]s. Dropped receivers are ignored.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl Notifier {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, event: UiEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

pub struct QueueScheduler<R> {
    registry: JobRegistry,
    runner: R,
    auth: AuthChallengeCoordinator,
    conflicts: OutputConflictResolver,
    notifier: Notifier,
}

impl<R> QueueScheduler<R> {
    pub fn new(runner: R, console: ConsoleConfig, notifier: Notifier) -> Self {
        Self {
            registry: JobRegistry::new(console),
            runner,
            auth: AuthChallengeCoordinator::new(),
            conflicts: OutputConflictResolver::new(),
            notifier,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn auth(&self) -> &AuthChallengeCoordinator {
        &self.auth
    }

    pub fn conflicts(&self) -> &OutputConflictResolver {
        &self.conflicts
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Queue currently executing a job.
    pub fn is_running(&self) -> bool {
        self.registry.running().is_some()
    }

    fn log_system(&mut self, id: JobId, message: impl Into<String>) {
        if let Some(job) = self.registry.get_mut(id) {
            job.log.append(Stream::System, message);
        }
    }

    fn notify_job(&self, id: JobId) {
        if let Some(job) = self.registry.get(id) {
            self.notifier.notify(UiEvent::JobUpdated {
                job: id,
                status: job.status(),
                progress: job.compression_progress(),
            });
        }
    }

    /// Idle = nothing running and nothing queued. Clears session-scoped login state.
    fn check_idle(&mut self) {
        if self.registry.running().is_none() && !self.registry.has_queued() {
            self.auth.on_queue_idle();
            self.notifier.notify(UiEvent::QueueIdle);
        }
    }
}
