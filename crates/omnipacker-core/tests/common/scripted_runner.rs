//! In-process runner that replays scripted notifications.
//!
//! Each `start_job` for an app pops the next script for that app and pushes its
//! steps onto the event channels, tagged with a fresh correlation id. Cancel and
//! email-code requests replay their own scripts against the current job.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use omnipacker_core::conflict::{ConflictChoice, OutputConflict};
use omnipacker_core::console::Stream;
use omnipacker_core::job::CorrelationId;
use omnipacker_core::runner::{JobRunner, RunnerError, RunnerEventSender, StartRequest, StartedJob};

#[derive(Debug, Clone)]
pub enum Step {
    Line(&'static str),
    Status(&'static str, Option<i32>),
    CompressionLine(&'static str),
    CompressionProgress(u8),
    Conflict(&'static str),
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<Vec<Step>>>,
    on_code: VecDeque<Vec<Step>>,
    on_cancel: VecDeque<Vec<Step>>,
    current: Option<CorrelationId>,
    starts: Vec<String>,
    codes: Vec<String>,
    choices: Vec<(CorrelationId, ConflictChoice)>,
}

#[derive(Clone)]
pub struct ScriptedRunner {
    events: RunnerEventSender,
    state: Arc<Mutex<State>>,
}

impl ScriptedRunner {
    pub fn new(events: RunnerEventSender) -> Self {
        Self {
            events,
            state: Arc::default(),
        }
    }

    pub fn script(&self, app_id: &str, steps: Vec<Step>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(app_id.to_string())
            .or_default()
            .push_back(steps);
        self
    }

    pub fn on_code(&self, steps: Vec<Step>) -> &Self {
        self.state.lock().unwrap().on_code.push_back(steps);
        self
    }

    pub fn on_cancel(&self, steps: Vec<Step>) -> &Self {
        self.state.lock().unwrap().on_cancel.push_back(steps);
        self
    }

    pub fn starts(&self) -> Vec<String> {
        self.state.lock().unwrap().starts.clone()
    }

    pub fn codes(&self) -> Vec<String> {
        self.state.lock().unwrap().codes.clone()
    }

    pub fn choices(&self) -> Vec<(CorrelationId, ConflictChoice)> {
        self.state.lock().unwrap().choices.clone()
    }

    fn replay(&self, correlation: &CorrelationId, steps: Vec<Step>) {
        let c = Some(correlation);
        for step in steps {
            match step {
                Step::Line(text) => self.events.log(c, Stream::Stdout, text),
                Step::Status(status, code) => self.events.status(c, status, code),
                Step::CompressionLine(text) => self.events.compression_log(c, Stream::Stdout, text),
                Step::CompressionProgress(p) => self.events.compression_progress(p),
                Step::Conflict(name) => self.events.output_conflict(OutputConflict {
                    correlation_id: correlation.clone(),
                    output_name: name.to_string(),
                    output_path: format!("/out/{name}"),
                }),
            }
        }
    }

    fn replay_current(&self, steps: Option<Vec<Step>>) {
        let current = self.state.lock().unwrap().current.clone();
        if let (Some(c), Some(steps)) = (current, steps) {
            self.replay(&c, steps);
        }
    }
}

impl JobRunner for ScriptedRunner {
    async fn start_job(&self, request: StartRequest) -> Result<StartedJob, RunnerError> {
        let (correlation, steps) = {
            let mut state = self.state.lock().unwrap();
            state.starts.push(request.app_id.clone());
            let steps = state
                .scripts
                .get_mut(&request.app_id)
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| RunnerError::Rejected(format!("no script for {}", request.app_id)))?;
            let correlation = CorrelationId::new(format!("{}-{}", request.app_id, state.starts.len()));
            state.current = Some(correlation.clone());
            (correlation, steps)
        };
        self.replay(&correlation, steps);
        Ok(StartedJob {
            correlation_id: correlation,
            staging_location: None,
        })
    }

    async fn cancel_download(&self) -> Result<(), RunnerError> {
        let steps = self.state.lock().unwrap().on_cancel.pop_front();
        self.replay_current(steps);
        Ok(())
    }

    async fn cancel_compression(&self) -> Result<(), RunnerError> {
        self.cancel_download().await
    }

    async fn submit_email_code(&self, code: String) -> Result<(), RunnerError> {
        let steps = {
            let mut state = self.state.lock().unwrap();
            state.codes.push(code);
            state.on_code.pop_front()
        };
        self.replay_current(steps);
        Ok(())
    }

    async fn resolve_conflict(
        &self,
        correlation_id: CorrelationId,
        choice: ConflictChoice,
    ) -> Result<(), RunnerError> {
        self.state.lock().unwrap().choices.push((correlation_id, choice));
        Ok(())
    }
}
