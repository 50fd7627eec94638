//! Ordered job registry: run/display order plus id → job map.

use std::collections::HashMap;

use super::{CorrelationId, Job, JobId, JobSpec, JobStatus};
use crate::config::ConsoleConfig;
use crate::console::ConsoleLogBuffer;

/// Owns every job. `order` and `jobs` always hold the same id set.
///
/// At most one job is marked running; that slot is only moved by the scheduler.
#[derive(Debug, Default)]
pub struct JobRegistry {
    order: Vec<JobId>,
    jobs: HashMap<JobId, Job>,
    selected: Option<JobId>,
    running: Option<JobId>,
    next_id: u64,
    console: ConsoleConfig,
}

impl JobRegistry {
    pub fn new(console: ConsoleConfig) -> Self {
        Self {
            console,
            ..Self::default()
        }
    }

    /// Appends a new queued job and returns its id. The first job added is selected.
    pub fn add(&mut self, spec: JobSpec) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        let job = Job::new(id, spec, ConsoleLogBuffer::new(&self.console));
        self.jobs.insert(id, job);
        self.order.push(id);
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in run/display order.
    pub fn order(&self) -> &[JobId] {
        &self.order
    }

    /// Jobs in run/display order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|id| self.jobs.get(id))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    pub fn selected(&self) -> Option<JobId> {
        self.selected
    }

    /// Marks `id` as the displayed job. Unknown ids are ignored.
    pub fn select(&mut self, id: JobId) -> bool {
        if self.jobs.contains_key(&id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn running(&self) -> Option<JobId> {
        self.running
    }

    pub fn running_job(&self) -> Option<&Job> {
        self.running.and_then(|id| self.jobs.get(&id))
    }

    pub fn running_job_mut(&mut self) -> Option<&mut Job> {
        let id = self.running?;
        self.jobs.get_mut(&id)
    }

    pub(crate) fn set_running(&mut self, id: Option<JobId>) {
        self.running = id;
    }

    /// Earliest job in registry order whose status is `queued`.
    pub fn first_queued(&self) -> Option<JobId> {
        self.iter()
            .find(|job| job.status() == JobStatus::Queued)
            .map(|job| job.id())
    }

    pub fn has_queued(&self) -> bool {
        self.first_queued().is_some()
    }

    pub fn find_by_correlation(&self, correlation: &CorrelationId) -> Option<JobId> {
        self.iter()
            .find(|job| job.correlation_id() == Some(correlation))
            .map(|job| job.id())
    }

    /// Moves `id` by `delta` positions, clamped to the ends of the list.
    pub(crate) fn move_by(&mut self, id: JobId, delta: isize) -> bool {
        let Some(from) = self.order.iter().position(|j| *j == id) else {
            return false;
        };
        let last = self.order.len().saturating_sub(1) as isize;
        let to = (from as isize + delta).clamp(0, last) as usize;
        if to == from {
            return false;
        }
        let moved = self.order.remove(from);
        self.order.insert(to, moved);
        true
    }

    pub(crate) fn remove(&mut self, id: JobId) -> Option<Job> {
        let job = self.jobs.remove(&id)?;
        self.order.retain(|j| *j != id);
        if self.selected == Some(id) {
            self.selected = self.order.first().copied();
        }
        Some(job)
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.jobs.clear();
        self.selected = None;
        self.running = None;
    }

    /// Checks the structural invariants; returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.order.len() != self.jobs.len() {
            return Err(format!(
                "order has {} ids but map has {} jobs",
                self.order.len(),
                self.jobs.len()
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.order {
            if !seen.insert(*id) {
                return Err(format!("{id} appears twice in order"));
            }
            if !self.jobs.contains_key(id) {
                return Err(format!("{id} in order but not in map"));
            }
        }
        let active: Vec<JobId> = self
            .iter()
            .filter(|j| j.status().is_active())
            .map(|j| j.id())
            .collect();
        if active.len() > 1 {
            return Err(format!("{} jobs active at once", active.len()));
        }
        match self.running {
            Some(id) => match self.jobs.get(&id) {
                Some(job) if job.status().is_active() => {}
                Some(job) => return Err(format!("running {id} has status {}", job.status())),
                None => return Err(format!("running {id} not in registry")),
            },
            None if !active.is_empty() => {
                return Err(format!("{} active without holding the running slot", active[0]))
            }
            None => {}
        }
        Ok(())
    }
}
