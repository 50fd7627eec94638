//! Output classification: raw runner lines and status payloads → signals.
//!
//! Classification is read-only. Line rules live in an ordered table
//! ([`rules::LINE_RULES`]); the first matching rule of each category wins and
//! rules from different categories may fire on the same line.

mod percent;
mod rules;
mod status;

pub use percent::extract_percent;
pub use rules::{is_qr_art, Category, Rule, LINE_RULES};
pub use status::{map_status, RunnerStatus};

use crate::console::Stream;
use crate::job::JobStatus;

/// Semantic signal extracted from runner output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Progress(u8),
    QrPromptStart,
    QrArtLine,
    /// First non-art line after at least one art line.
    QrCaptureEnd,
    QrLoginSuccess { username: Option<String> },
    HardwareTokenPrompt,
    HardwareTokenConfirmed,
    EmailPrompt { provider: Option<String> },
    EmailInvalidCode,
    EmailNoCodeProvided,
    MissingDepotsWarning,
    StatusTransition(JobStatus),
}

/// Per-job capture state a line is read against. Supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyContext {
    pub qr_capturing: bool,
    pub qr_art_lines: usize,
}

/// One line plus everything rules may look at.
#[derive(Debug, Clone, Copy)]
pub struct LineInput<'a> {
    pub line: &'a str,
    pub stream: Stream,
    pub ctx: ClassifyContext,
}

/// Runs the line rule table. Returns an empty vec on a classification miss.
pub fn classify_line(line: &str, stream: Stream, ctx: ClassifyContext) -> Vec<Signal> {
    let input = LineInput { line, stream, ctx };
    let mut fired: Vec<Category> = Vec::new();
    let mut signals = Vec::new();
    for rule in LINE_RULES {
        if fired.contains(&rule.category) {
            continue;
        }
        if let Some(signal) = (rule.matcher)(&input) {
            tracing::trace!(rule = rule.name, "classified line");
            fired.push(rule.category);
            signals.push(signal);
        }
    }
    signals
}

/// Maps a structured status payload to a transition signal.
pub fn classify_status(status: &str, code: Option<i32>) -> Option<Signal> {
    RunnerStatus::parse(status, code).map(|s| Signal::StatusTransition(map_status(s)))
}
