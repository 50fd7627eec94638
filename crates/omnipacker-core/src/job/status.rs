use std::fmt;

/// Job lifecycle: `queued → running → [compressing →] done | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Compressing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Compressing => "compressing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Running or compressing: holds the single execution slot.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Compressing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
