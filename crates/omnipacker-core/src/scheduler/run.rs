//! The control loop: one task that owns the scheduler and serializes user
//! commands, runner notifications and console flushes.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{QueueError, QueueScheduler, UiEvent};
use crate::conflict::ConflictChoice;
use crate::job::{JobId, JobSpec};
use crate::runner::{JobRunner, RunnerEventReceiver};

/// User requests accepted by [`QueueScheduler::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Enqueue(JobSpec),
    Start,
    Cancel,
    SubmitEmailCode(String),
    ResolveConflict(ConflictChoice),
    Reorder { job: JobId, delta: isize },
    Remove(JobId),
    Clear,
    Select(JobId),
    Shutdown,
}

impl<R: JobRunner> QueueScheduler<R> {
    /// Applies one command. Returns false for [`Command::Shutdown`].
    pub async fn handle_command(&mut self, command: Command) -> bool {
        let result: Result<(), QueueError> = match command {
            Command::Enqueue(spec) => {
                self.enqueue(spec);
                Ok(())
            }
            Command::Start => self.start().await.map(|_| ()),
            Command::Cancel => self.cancel().await,
            Command::SubmitEmailCode(code) => self.submit_email_code(&code).await,
            Command::ResolveConflict(choice) => self.resolve_conflict(choice).await,
            Command::Reorder { job, delta } => {
                if !self.reorder(job, delta) {
                    tracing::debug!(%job, delta, "reorder ignored");
                }
                Ok(())
            }
            Command::Remove(job) => {
                if !self.remove(job) {
                    tracing::debug!(%job, "remove ignored");
                }
                Ok(())
            }
            Command::Clear => self.clear(),
            Command::Select(job) => {
                self.select(job);
                Ok(())
            }
            Command::Shutdown => return false,
        };
        if let Err(e) = result {
            tracing::warn!("command rejected: {}", e);
            // start/clear already sent their own advisory
            if !matches!(e, QueueError::AlreadyRunning(_) | QueueError::QueueBusy) {
                self.notifier.notify(UiEvent::Advisory(e.to_string()));
            }
        }
        true
    }

    /// Runs until [`Command::Shutdown`] or until every command sender is dropped.
    /// Returns the scheduler so callers can inspect the final queue.
    pub async fn run(
        mut self,
        mut events: RunnerEventReceiver,
        mut commands: mpsc::UnboundedReceiver<Command>,
        flush_interval: Duration,
    ) -> Self {
        let mut ticker = tokio::time::interval(flush_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut download_open = true;
        let mut compression_open = true;

        tracing::debug!("control loop started");
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => break,
                },
                event = events.download.recv(), if download_open => match event {
                    Some(event) => self.handle_download_event(event).await,
                    None => download_open = false,
                },
                event = events.compression.recv(), if compression_open => match event {
                    Some(event) => self.handle_compression_event(event).await,
                    None => compression_open = false,
                },
                _ = ticker.tick() => {
                    self.flush_console(Instant::now());
                }
            }
        }

        // Drain notifications already emitted so the final state is observed.
        while let Ok(event) = events.download.try_recv() {
            self.handle_download_event(event).await;
        }
        while let Ok(event) = events.compression.try_recv() {
            self.handle_compression_event(event).await;
        }
        self.flush_console(Instant::now() + flush_interval);
        tracing::debug!("control loop stopped");
        self
    }
}
