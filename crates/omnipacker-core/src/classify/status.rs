//! Runner status payloads and the fixed status → job status table.

use crate::job::JobStatus;

/// Status reported by the external runner, as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    Starting,
    ResolvingMetadata,
    Running,
    Finalizing,
    Compressing,
    Completed,
    FinalizationFailed,
    Error,
    Exited { code: Option<i32> },
}

impl RunnerStatus {
    /// Parses a wire status. Unknown statuses are a classification miss.
    pub fn parse(status: &str, code: Option<i32>) -> Option<Self> {
        let parsed = match status.trim() {
            "starting" => RunnerStatus::Starting,
            "resolving_metadata" => RunnerStatus::ResolvingMetadata,
            "running" => RunnerStatus::Running,
            "finalizing" => RunnerStatus::Finalizing,
            "compressing" => RunnerStatus::Compressing,
            "completed" => RunnerStatus::Completed,
            "finalization_failed" => RunnerStatus::FinalizationFailed,
            "error" => RunnerStatus::Error,
            "exited" => RunnerStatus::Exited { code },
            _ => return None,
        };
        Some(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunnerStatus::Starting => "starting",
            RunnerStatus::ResolvingMetadata => "resolving_metadata",
            RunnerStatus::Running => "running",
            RunnerStatus::Finalizing => "finalizing",
            RunnerStatus::Compressing => "compressing",
            RunnerStatus::Completed => "completed",
            RunnerStatus::FinalizationFailed => "finalization_failed",
            RunnerStatus::Error => "error",
            RunnerStatus::Exited { .. } => "exited",
        }
    }

    pub fn code(self) -> Option<i32> {
        match self {
            RunnerStatus::Exited { code } => code,
            RunnerStatus::Completed => Some(0),
            _ => None,
        }
    }
}

/// The status table. Total over [`RunnerStatus`]; `exited` without a code is a failure.
pub fn map_status(status: RunnerStatus) -> JobStatus {
    match status {
        RunnerStatus::Starting
        | RunnerStatus::ResolvingMetadata
        | RunnerStatus::Running
        | RunnerStatus::Finalizing => JobStatus::Running,
        RunnerStatus::Compressing => JobStatus::Compressing,
        RunnerStatus::Completed => JobStatus::Done,
        RunnerStatus::FinalizationFailed | RunnerStatus::Error => JobStatus::Failed,
        RunnerStatus::Exited { code: Some(0) } => JobStatus::Done,
        RunnerStatus::Exited { .. } => JobStatus::Failed,
    }
}
