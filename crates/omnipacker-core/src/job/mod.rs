//! Jobs: one queued download (and optional archive) per entry.
//!
//! A `Job` is owned by the [`JobRegistry`]; only the scheduler mutates its
//! status. Optional fields are real `Option`s so "cleared on phase exit" is
//! checkable.

mod registry;
mod spec;
mod status;

pub use registry::JobRegistry;
pub use spec::{redact_args, CompressionOptions, Credentials, JobSpec, TargetOs};
pub use status::JobStatus;

use std::fmt;

use crate::auth::AuthChallengeState;
use crate::console::ConsoleLogBuffer;

/// Registry-assigned job identifier (monotonic, never reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Identifier assigned by the external runner once the backing process starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work and everything the engine tracks about it.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    pub spec: JobSpec,
    status: JobStatus,
    pub log: ConsoleLogBuffer,
    compression_progress: Option<u8>,
    /// Rendered QR art once capture finished.
    pub qr_text: Option<String>,
    pub auth: AuthChallengeState,
    correlation_id: Option<CorrelationId>,
    staging_location: Option<String>,
}

impl Job {
    pub(crate) fn new(id: JobId, spec: JobSpec, log: ConsoleLogBuffer) -> Self {
        Self {
            id,
            spec,
            status: JobStatus::Queued,
            log,
            compression_progress: None,
            qr_text: None,
            auth: AuthChallengeState::default(),
            correlation_id: None,
            staging_location: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn compression_progress(&self) -> Option<u8> {
        self.compression_progress
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn staging_location(&self) -> Option<&str> {
        self.staging_location.as_deref()
    }

    /// Moves to `next`, keeping progress consistent with the compressing phase.
    pub(crate) fn set_status(&mut self, next: JobStatus) {
        if next == JobStatus::Compressing {
            if self.compression_progress.is_none() {
                self.compression_progress = Some(0);
            }
        } else {
            self.compression_progress = None;
        }
        self.status = next;
    }

    /// Records compression progress; ignored outside the compressing phase.
    pub(crate) fn set_compression_progress(&mut self, percent: u8) -> bool {
        if self.status != JobStatus::Compressing {
            return false;
        }
        self.compression_progress = Some(percent.min(100));
        true
    }

    /// Adopts a correlation id. Returns false if a different id is already set.
    pub(crate) fn adopt_correlation_id(&mut self, id: CorrelationId) -> bool {
        match &self.correlation_id {
            Some(existing) => *existing == id,
            None => {
                self.correlation_id = Some(id);
                true
            }
        }
    }

    pub(crate) fn set_staging_location(&mut self, location: impl Into<String>) {
        if self.staging_location.is_none() {
            self.staging_location = Some(location.into());
        }
    }

    /// Full reset back to `queued` before an automatic restart.
    pub(crate) fn reset_for_retry(&mut self) {
        self.status = JobStatus::Queued;
        self.compression_progress = None;
        self.correlation_id = None;
        self.staging_location = None;
        self.qr_text = None;
        self.auth = AuthChallengeState::default();
    }
}
