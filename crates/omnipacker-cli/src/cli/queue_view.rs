//! Plain-text rendering of queue notifications for the terminal.

use omnipacker_core::console::{ConsoleFlush, ConsoleLine, Stream};
use omnipacker_core::job::{JobId, JobStatus};
use omnipacker_core::scheduler::UiEvent;
use std::collections::{HashMap, HashSet};

const PROGRESS_STEP: u8 = 10;

/// Turns [`UiEvent`]s into printable lines, suppressing repeats.
#[derive(Debug, Default)]
pub struct QueueView {
    status: HashMap<JobId, JobStatus>,
    progress: HashMap<JobId, u8>,
    console_started: HashSet<JobId>,
}

impl QueueView {
    pub fn render(&mut self, event: &UiEvent) -> Vec<String> {
        match event {
            UiEvent::JobAdded(job) => vec![format!("[{job}] queued")],
            UiEvent::JobUpdated {
                job,
                status,
                progress,
            } => self.job_updated(*job, *status, *progress),
            UiEvent::JobRemoved(job) => vec![format!("[{job}] removed")],
            UiEvent::QueueCleared => vec!["Queue cleared.".to_string()],
            UiEvent::QueueIdle => vec!["Queue idle.".to_string()],
            UiEvent::Selected(_) => Vec::new(),
            UiEvent::Console { job, flush } => self.console(*job, flush),
            UiEvent::QrCode { job, text } => {
                let mut lines = vec![format!("[{job}] scan this QR code with the mobile app:")];
                lines.extend(text.lines().map(str::to_string));
                lines
            }
            UiEvent::QrLoggedIn { job } => vec![format!("[{job}] QR login confirmed")],
            UiEvent::HardwareTokenPrompt { job } => {
                vec![format!("[{job}] confirm the sign-in in the mobile app")]
            }
            UiEvent::HardwareTokenConfirmed { job } => {
                vec![format!("[{job}] mobile confirmation received")]
            }
            UiEvent::EmailCodeRequested { job, provider } => {
                let from = provider
                    .as_deref()
                    .map(|p| format!(" sent to {p}"))
                    .unwrap_or_default();
                vec![format!("[{job}] enter the email code{from}: code <CODE>")]
            }
            UiEvent::EmailPromptClosed { .. } => Vec::new(),
            UiEvent::MissingDepots { job } => {
                vec![format!("[{job}] no depots found; check the selected OS")]
            }
            UiEvent::OutputConflict(conflict) => vec![format!(
                "Output already exists: {}. Answer with overwrite, copy or skip.",
                conflict.output_path
            )],
            UiEvent::Advisory(message) => vec![format!("! {message}")],
        }
    }

    fn job_updated(&mut self, job: JobId, status: JobStatus, progress: Option<u8>) -> Vec<String> {
        let mut lines = Vec::new();
        if self.status.insert(job, status) != Some(status) {
            lines.push(format!("[{job}] {status}"));
            self.progress.remove(&job);
        }
        if let Some(pct) = progress {
            let step = pct - pct % PROGRESS_STEP;
            let last = self.progress.get(&job).copied();
            if last.map_or(true, |l| step > l) {
                self.progress.insert(job, step);
                lines.push(format!("[{job}] compressing {pct}%"));
            }
        }
        lines
    }

    fn console(&mut self, job: JobId, flush: &ConsoleFlush) -> Vec<String> {
        let first = self.console_started.insert(job);
        let shown: &[ConsoleLine] = match flush {
            ConsoleFlush::Append(lines) => lines.as_slice(),
            ConsoleFlush::Full(lines) if first => lines.as_slice(),
            // Already printed; a full redraw only matters to a scrolling view.
            ConsoleFlush::Full(_) => &[],
        };
        shown
            .iter()
            .map(|l| match l.stream {
                Stream::Stderr => format!("[{job}] ! {}", l.text),
                _ => format!("[{job}] {}", l.text),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> ConsoleLine {
        ConsoleLine {
            stream: Stream::Stdout,
            text: text.into(),
        }
    }

    #[test]
    fn status_printed_once_per_change() {
        let mut view = QueueView::default();
        let ev = UiEvent::JobUpdated {
            job: JobId(1),
            status: JobStatus::Running,
            progress: None,
        };
        assert_eq!(view.render(&ev), vec!["[job-1] running"]);
        assert!(view.render(&ev).is_empty());
    }

    #[test]
    fn compression_progress_in_steps() {
        let mut view = QueueView::default();
        let at = |pct| UiEvent::JobUpdated {
            job: JobId(1),
            status: JobStatus::Compressing,
            progress: Some(pct),
        };
        assert_eq!(view.render(&at(3)).len(), 2);
        assert!(view.render(&at(7)).is_empty());
        assert_eq!(view.render(&at(12)), vec!["[job-1] compressing 12%"]);
    }

    #[test]
    fn full_console_redraw_is_not_reprinted() {
        let mut view = QueueView::default();
        let job = JobId(2);
        let full = UiEvent::Console {
            job,
            flush: ConsoleFlush::Full(vec![line("a")]),
        };
        assert_eq!(view.render(&full), vec!["[job-2] a"]);
        let append = UiEvent::Console {
            job,
            flush: ConsoleFlush::Append(vec![line("b")]),
        };
        assert_eq!(view.render(&append), vec!["[job-2] b"]);
        assert!(view.render(&full).is_empty());
    }
}
