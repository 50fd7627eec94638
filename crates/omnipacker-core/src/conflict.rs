//! "Destination already exists" decisions, one active conflict at a time.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::job::CorrelationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    Overwrite,
    Copy,
    Cancel,
}

impl ConflictChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictChoice::Overwrite => "overwrite",
            ConflictChoice::Copy => "copy",
            ConflictChoice::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ConflictChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "overwrite" => Ok(ConflictChoice::Overwrite),
            "copy" => Ok(ConflictChoice::Copy),
            "cancel" | "skip" => Ok(ConflictChoice::Cancel),
            other => Err(format!("unknown conflict choice: {other}")),
        }
    }
}

/// A conflict reported by the runner before it finalizes output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    pub correlation_id: CorrelationId,
    pub output_name: String,
    pub output_path: String,
}

/// Sequential conflict queue. Only the active conflict is presented; later
/// reports wait until it is resolved.
#[derive(Debug, Default)]
pub struct OutputConflictResolver {
    active: Option<OutputConflict>,
    waiting: VecDeque<OutputConflict>,
}

impl OutputConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&OutputConflict> {
        self.active.as_ref()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Registers a conflict. Returns it if it became the active one (and should be presented).
    pub fn report(&mut self, conflict: OutputConflict) -> Option<&OutputConflict> {
        let duplicate = self.active.as_ref() == Some(&conflict) || self.waiting.contains(&conflict);
        if duplicate {
            return None;
        }
        if self.active.is_none() {
            self.active = Some(conflict);
            return self.active.as_ref();
        }
        self.waiting.push_back(conflict);
        None
    }

    /// Takes the active conflict so its choice can be forwarded.
    pub fn take_active(&mut self) -> Option<OutputConflict> {
        self.active.take()
    }

    /// Puts a conflict back as active after its resolution could not be delivered.
    pub fn restore(&mut self, conflict: OutputConflict) {
        if let Some(current) = self.active.replace(conflict) {
            self.waiting.push_front(current);
        }
    }

    /// Promotes the next waiting conflict, if none is active.
    pub fn advance(&mut self) -> Option<&OutputConflict> {
        if self.active.is_none() {
            self.active = self.waiting.pop_front();
        }
        self.active.as_ref()
    }
}
