//! Boundary with the external download and compression processes.
//!
//! Requests go out through [`JobRunner`]; notifications come back over the
//! channels in [`events`], one channel per process so each process's
//! emission order is preserved.

mod error;
pub mod events;
mod id;

pub use error::RunnerError;
pub use events::{
    channel, CompressionEvent, DownloadEvent, LogEvent, RunnerEventReceiver, RunnerEventSender,
    StatusEvent,
};
pub use id::generate_correlation_id;

use std::future::Future;

use crate::conflict::ConflictChoice;
use crate::job::{CompressionOptions, CorrelationId, Credentials, JobSpec, TargetOs};

/// Everything the runner needs to start one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub app_id: String,
    pub os: TargetOs,
    pub branch: String,
    pub credentials: Credentials,
    pub compression: CompressionOptions,
}

impl StartRequest {
    pub fn new(spec: &JobSpec, credentials: Credentials) -> Self {
        Self {
            app_id: spec.app_id.clone(),
            os: spec.os,
            branch: spec.branch.clone(),
            credentials,
            compression: spec.compression.clone(),
        }
    }

    pub fn downloader_args(&self) -> Vec<String> {
        let spec = JobSpec {
            app_id: self.app_id.clone(),
            os: self.os,
            branch: self.branch.clone(),
            credentials: self.credentials.clone(),
            compression: self.compression.clone(),
        };
        spec.downloader_args(&self.credentials)
    }
}

/// Reply to a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJob {
    pub correlation_id: CorrelationId,
    pub staging_location: Option<String>,
}

/// Requests the engine sends to the external runner. Each call suspends the
/// control loop until the runner answers.
pub trait JobRunner {
    fn start_job(
        &self,
        request: StartRequest,
    ) -> impl Future<Output = Result<StartedJob, RunnerError>> + Send;

    fn cancel_download(&self) -> impl Future<Output = Result<(), RunnerError>> + Send;

    fn cancel_compression(&self) -> impl Future<Output = Result<(), RunnerError>> + Send;

    fn submit_email_code(
        &self,
        code: String,
    ) -> impl Future<Output = Result<(), RunnerError>> + Send;

    fn resolve_conflict(
        &self,
        correlation_id: CorrelationId,
        choice: ConflictChoice,
    ) -> impl Future<Output = Result<(), RunnerError>> + Send;
}
