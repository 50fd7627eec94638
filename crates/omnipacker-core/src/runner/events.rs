//! Push notifications from the runner.

use tokio::sync::mpsc;

use crate::conflict::OutputConflict;
use crate::console::Stream;
use crate::job::CorrelationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub correlation_id: Option<CorrelationId>,
    pub stream: Stream,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub correlation_id: Option<CorrelationId>,
    pub status: String,
    pub code: Option<i32>,
}

/// Everything the download process reports, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Log(LogEvent),
    Status(StatusEvent),
    OutputConflict(OutputConflict),
}

/// Everything the compression process reports, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionEvent {
    Log(LogEvent),
    Status(StatusEvent),
    Progress(u8),
}

/// Runner side of the notification channels. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunnerEventSender {
    download: mpsc::UnboundedSender<DownloadEvent>,
    compression: mpsc::UnboundedSender<CompressionEvent>,
}

/// Engine side of the notification channels.
#[derive(Debug)]
pub struct RunnerEventReceiver {
    pub download: mpsc::UnboundedReceiver<DownloadEvent>,
    pub compression: mpsc::UnboundedReceiver<CompressionEvent>,
}

pub fn channel() -> (RunnerEventSender, RunnerEventReceiver) {
    let (download_tx, download_rx) = mpsc::unbounded_channel();
    let (compression_tx, compression_rx) = mpsc::unbounded_channel();
    (
        RunnerEventSender {
            download: download_tx,
            compression: compression_tx,
        },
        RunnerEventReceiver {
            download: download_rx,
            compression: compression_rx,
        },
    )
}

// Send results are ignored: a closed channel means the control loop has shut down.
impl RunnerEventSender {
    pub fn log(&self, correlation_id: Option<&CorrelationId>, stream: Stream, line: impl Into<String>) {
        let _ = self.download.send(DownloadEvent::Log(LogEvent {
            correlation_id: correlation_id.cloned(),
            stream,
            line: line.into(),
        }));
    }

    pub fn status(&self, correlation_id: Option<&CorrelationId>, status: &str, code: Option<i32>) {
        let _ = self.download.send(DownloadEvent::Status(StatusEvent {
            correlation_id: correlation_id.cloned(),
            status: status.to_string(),
            code,
        }));
    }

    pub fn output_conflict(&self, conflict: OutputConflict) {
        let _ = self.download.send(DownloadEvent::OutputConflict(conflict));
    }

    pub fn compression_log(
        &self,
        correlation_id: Option<&CorrelationId>,
        stream: Stream,
        line: impl Into<String>,
    ) {
        let _ = self.compression.send(CompressionEvent::Log(LogEvent {
            correlation_id: correlation_id.cloned(),
            stream,
            line: line.into(),
        }));
    }

    pub fn compression_status(
        &self,
        correlation_id: Option<&CorrelationId>,
        status: &str,
        code: Option<i32>,
    ) {
        let _ = self.compression.send(CompressionEvent::Status(StatusEvent {
            correlation_id: correlation_id.cloned(),
            status: status.to_string(),
            code,
        }));
    }

    pub fn compression_progress(&self, percent: u8) {
        let _ = self.compression.send(CompressionEvent::Progress(percent));
    }
}
