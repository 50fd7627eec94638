//! Bounded per-job console log with coalesced flushes.
//!
//! Appends only mark the buffer dirty; a flush is produced at most once per
//! `flush_interval`. Once the buffer grows past `max_lines + drop_margin` the
//! oldest lines are dropped in one batch and the next flush is a full render.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::ConsoleConfig;

/// Which stream a console line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
    /// Messages produced by the engine itself.
    System,
}

impl Stream {
    pub fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
            Stream::System => "system",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub stream: Stream,
    pub text: String,
}

/// What the view must do with a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleFlush {
    /// Replace everything shown with these lines.
    Full(Vec<ConsoleLine>),
    /// Append these lines to what is already shown.
    Append(Vec<ConsoleLine>),
}

#[derive(Debug, Clone)]
pub struct ConsoleLogBuffer {
    lines: VecDeque<ConsoleLine>,
    max_lines: usize,
    drop_margin: usize,
    flush_interval: Duration,
    /// Lines appended since the last flush.
    unflushed: usize,
    dirty: bool,
    needs_full: bool,
    last_flush: Option<Instant>,
    dropped: u64,
}

impl ConsoleLogBuffer {
    pub fn new(cfg: &ConsoleConfig) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: cfg.max_lines.max(1),
            drop_margin: cfg.drop_margin,
            flush_interval: cfg.flush_interval(),
            unflushed: 0,
            dirty: false,
            needs_full: false,
            last_flush: None,
            dropped: 0,
        }
    }

    pub fn append(&mut self, stream: Stream, text: impl Into<String>) {
        self.lines.push_back(ConsoleLine {
            stream,
            text: text.into(),
        });
        self.unflushed += 1;
        self.dirty = true;

        if self.lines.len() > self.max_lines + self.drop_margin {
            let excess = self.lines.len() - self.max_lines;
            self.lines.drain(..excess);
            self.dropped += excess as u64;
            self.needs_full = true;
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &ConsoleLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&ConsoleLine> {
        self.lines.back()
    }

    /// Total lines discarded by retention so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Next flush must be a full render (e.g. the view switched to this job).
    pub fn request_full_render(&mut self) {
        self.needs_full = true;
        self.dirty = true;
    }

    /// True if dirty and the flush interval has elapsed since the previous flush.
    pub fn flush_due(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_flush {
            Some(last) => now.saturating_duration_since(last) >= self.flush_interval,
            None => true,
        }
    }

    /// Produces the pending render, or `None` if nothing is due yet.
    pub fn flush(&mut self, now: Instant) -> Option<ConsoleFlush> {
        if !self.flush_due(now) {
            return None;
        }
        let out = if self.needs_full {
            ConsoleFlush::Full(self.lines.iter().cloned().collect())
        } else {
            let take = self.unflushed.min(self.lines.len());
            let start = self.lines.len() - take;
            ConsoleFlush::Append(self.lines.range(start..).cloned().collect())
        };
        self.unflushed = 0;
        self.dirty = false;
        self.needs_full = false;
        self.last_flush = Some(now);
        Some(out)
    }
}
