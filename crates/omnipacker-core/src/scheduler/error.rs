use crate::job::JobId;
use crate::runner::RunnerError;

/// Rejections and failures of scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("a job is already running ({0})")]
    AlreadyRunning(JobId),
    #[error("no queued job to start")]
    NothingQueued,
    #[error("no job is running")]
    NotRunning,
    #[error("cannot clear the queue while a job is running")]
    QueueBusy,
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("failed to start {job}: {source}")]
    StartupFailed {
        job: JobId,
        #[source]
        source: RunnerError,
    },
    #[error("email code is empty")]
    EmptyCode,
    #[error("no email code was requested")]
    NoPendingEmailPrompt,
    #[error("no output conflict is awaiting a decision")]
    NoPendingConflict,
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
