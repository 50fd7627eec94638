use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::*;
use crate::conflict::ConflictChoice;
use crate::console::Stream;
use crate::job::{CorrelationId, Credentials, JobSpec, TargetOs};
use crate::runner::{
    CompressionEvent, DownloadEvent, JobRunner, LogEvent, RunnerError, StartRequest, StartedJob,
    StatusEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Start { app_id: String, credentials: Credentials },
    CancelDownload,
    CancelCompression,
    EmailCode(String),
    Conflict(CorrelationId, ConflictChoice),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    started: usize,
    fail_starts: VecDeque<bool>,
    fail_cancel: bool,
    cancel_finds_nothing: bool,
    fail_conflict: bool,
}

#[derive(Clone, Default)]
struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn fail_next_start(&self) {
        self.state.lock().unwrap().fail_starts.push_back(true);
    }
}

impl JobRunner for FakeRunner {
    async fn start_job(&self, request: StartRequest) -> Result<StartedJob, RunnerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Start {
            app_id: request.app_id.clone(),
            credentials: request.credentials.clone(),
        });
        if state.fail_starts.pop_front().unwrap_or(false) {
            return Err(RunnerError::Unavailable("runner offline".into()));
        }
        state.started += 1;
        Ok(StartedJob {
            correlation_id: CorrelationId::new(format!("corr-{}", state.started)),
            staging_location: Some(format!("/tmp/staging/{}", request.app_id)),
        })
    }

    async fn cancel_download(&self) -> Result<(), RunnerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CancelDownload);
        if state.fail_cancel {
            return Err(RunnerError::Rejected("cannot cancel".into()));
        }
        if state.cancel_finds_nothing {
            return Err(RunnerError::NotRunning("download"));
        }
        Ok(())
    }

    async fn cancel_compression(&self) -> Result<(), RunnerError> {
        self.state.lock().unwrap().calls.push(Call::CancelCompression);
        Ok(())
    }

    async fn submit_email_code(&self, code: String) -> Result<(), RunnerError> {
        self.state.lock().unwrap().calls.push(Call::EmailCode(code));
        Ok(())
    }

    async fn resolve_conflict(
        &self,
        correlation_id: CorrelationId,
        choice: ConflictChoice,
    ) -> Result<(), RunnerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Conflict(correlation_id, choice));
        if state.fail_conflict {
            return Err(RunnerError::Rejected("conflict gone".into()));
        }
        Ok(())
    }
}

fn scheduler() -> (QueueScheduler<FakeRunner>, FakeRunner) {
    let runner = FakeRunner::default();
    let sched = QueueScheduler::new(runner.clone(), ConsoleConfig::default(), Notifier::disabled());
    (sched, runner)
}

fn with_ui() -> (
    QueueScheduler<FakeRunner>,
    FakeRunner,
    mpsc::UnboundedReceiver<UiEvent>,
) {
    let runner = FakeRunner::default();
    let (tx, rx) = mpsc::unbounded_channel();
    let sched = QueueScheduler::new(runner.clone(), ConsoleConfig::default(), Notifier::new(tx));
    (sched, runner, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn corr(n: usize) -> Option<CorrelationId> {
    Some(CorrelationId::new(format!("corr-{n}")))
}

fn spec(app: &str) -> JobSpec {
    JobSpec::new(app, TargetOs::WindowsX64, "public")
}

async fn status(sched: &mut QueueScheduler<FakeRunner>, c: Option<CorrelationId>, s: &str, code: Option<i32>) {
    sched
        .handle_download_event(DownloadEvent::Status(StatusEvent {
            correlation_id: c,
            status: s.to_string(),
            code,
        }))
        .await;
    sched.registry().check_invariants().unwrap();
}

async fn line(sched: &mut QueueScheduler<FakeRunner>, c: Option<CorrelationId>, text: &str) {
    sched
        .handle_download_event(DownloadEvent::Log(LogEvent {
            correlation_id: c,
            stream: Stream::Stdout,
            line: text.to_string(),
        }))
        .await;
    sched.registry().check_invariants().unwrap();
}

fn status_of(sched: &QueueScheduler<FakeRunner>, id: JobId) -> JobStatus {
    sched.registry().get(id).unwrap().status()
}

#[tokio::test]
async fn start_marks_first_queued_running_and_records_correlation() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    let b = sched.enqueue(spec("570"));

    let started = sched.start().await.unwrap();
    assert_eq!(started, a);
    assert_eq!(status_of(&sched, a), JobStatus::Running);
    assert_eq!(status_of(&sched, b), JobStatus::Queued);
    let job = sched.registry().get(a).unwrap();
    assert_eq!(job.correlation_id(), corr(1).as_ref());
    assert_eq!(job.staging_location(), Some("/tmp/staging/440"));
    assert!(matches!(runner.calls()[0], Call::Start { ref app_id, .. } if app_id == "440"));
    sched.registry().check_invariants().unwrap();
}

#[tokio::test]
async fn start_while_running_is_rejected_with_one_advisory() {
    let (mut sched, _runner, mut rx) = with_ui();
    let a = sched.enqueue(spec("440"));
    sched.enqueue(spec("570"));
    sched.start().await.unwrap();
    drain(&mut rx);

    let err = sched.start().await.unwrap_err();
    assert!(matches!(err, QueueError::AlreadyRunning(id) if id == a));
    let advisories: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, UiEvent::Advisory(_)))
        .collect();
    assert_eq!(advisories.len(), 1);
}

#[tokio::test]
async fn start_with_empty_queue_reports_nothing_queued() {
    let (mut sched, _runner) = scheduler();
    assert!(matches!(sched.start().await, Err(QueueError::NothingQueued)));
}

#[tokio::test]
async fn reorder_changes_which_job_starts_first() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    let c = sched.enqueue(spec("3"));
    assert!(sched.reorder(c, -5));
    assert_eq!(sched.registry().order(), &[c, a, b]);
    assert_eq!(sched.start().await.unwrap(), c);
}

#[tokio::test]
async fn completion_clears_progress_and_starts_next() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    let b = sched.enqueue(spec("570"));
    sched.start().await.unwrap();

    status(&mut sched, corr(1), "compressing", None).await;
    assert_eq!(status_of(&sched, a), JobStatus::Compressing);
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), Some(0));

    status(&mut sched, corr(1), "completed", Some(0)).await;
    let job_a = sched.registry().get(a).unwrap();
    assert_eq!(job_a.status(), JobStatus::Done);
    assert_eq!(job_a.compression_progress(), None);
    assert_eq!(status_of(&sched, b), JobStatus::Running);
    assert_eq!(sched.registry().running(), Some(b));
    assert_eq!(
        runner
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Start { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn exit_code_decides_outcome() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    let c = sched.enqueue(spec("3"));
    sched.start().await.unwrap();

    status(&mut sched, corr(1), "exited", Some(0)).await;
    status(&mut sched, corr(2), "exited", Some(3)).await;
    status(&mut sched, corr(3), "exited", None).await;
    assert_eq!(status_of(&sched, a), JobStatus::Done);
    assert_eq!(status_of(&sched, b), JobStatus::Failed);
    assert_eq!(status_of(&sched, c), JobStatus::Failed);
    assert!(!sched.is_running());
}

#[tokio::test]
async fn progress_is_last_reported_value_not_monotonic() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();

    line(&mut sched, corr(1), "40% while downloading").await;
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), None);

    status(&mut sched, corr(1), "compressing", None).await;
    line(&mut sched, corr(1), "75% done").await;
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), Some(75));
    line(&mut sched, corr(1), "60%").await;
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), Some(60));
}

#[tokio::test]
async fn compression_channel_reports_progress_and_status() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();

    sched
        .handle_compression_event(CompressionEvent::Status(StatusEvent {
            correlation_id: corr(1),
            status: "compressing".into(),
            code: None,
        }))
        .await;
    sched
        .handle_compression_event(CompressionEvent::Log(LogEvent {
            correlation_id: corr(1),
            stream: Stream::Stdout,
            line: " 33% 12 + data.pak".into(),
        }))
        .await;
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), Some(33));
    sched
        .handle_compression_event(CompressionEvent::Progress(90))
        .await;
    assert_eq!(sched.registry().get(a).unwrap().compression_progress(), Some(90));

    // terminal compression status does not finish the job
    sched
        .handle_compression_event(CompressionEvent::Status(StatusEvent {
            correlation_id: corr(1),
            status: "exited".into(),
            code: Some(0),
        }))
        .await;
    assert_eq!(status_of(&sched, a), JobStatus::Compressing);
}

#[tokio::test]
async fn startup_failure_fails_job_and_frees_slot() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    runner.fail_next_start();

    let err = sched.start().await.unwrap_err();
    assert!(matches!(err, QueueError::StartupFailed { job, .. } if job == a));
    assert_eq!(status_of(&sched, a), JobStatus::Failed);
    assert!(!sched.is_running());
    let last = sched.registry().get(a).unwrap().log.last().unwrap();
    assert!(last.text.starts_with("Failed to start"));
    sched.registry().check_invariants().unwrap();
}

#[tokio::test]
async fn failed_start_moves_on_to_next_queued_job() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    let b = sched.enqueue(spec("570"));
    runner.fail_next_start();

    assert!(sched.start().await.is_err());
    assert_eq!(status_of(&sched, a), JobStatus::Failed);
    assert_eq!(status_of(&sched, b), JobStatus::Running);
    assert_eq!(sched.registry().running(), Some(b));
}

#[tokio::test]
async fn auto_advance_skips_jobs_that_fail_to_start() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    let c = sched.enqueue(spec("3"));
    sched.start().await.unwrap();
    runner.fail_next_start();

    status(&mut sched, corr(1), "completed", Some(0)).await;
    assert_eq!(status_of(&sched, a), JobStatus::Done);
    assert_eq!(status_of(&sched, b), JobStatus::Failed);
    assert_eq!(status_of(&sched, c), JobStatus::Running);
}

#[tokio::test]
async fn queue_mutations_are_rejected_while_running() {
    let (mut sched, _runner, mut rx) = with_ui();
    let a = sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    sched.start().await.unwrap();
    drain(&mut rx);

    assert!(!sched.reorder(b, -1));
    assert!(!sched.remove(b));
    assert!(matches!(sched.clear(), Err(QueueError::QueueBusy)));
    assert_eq!(sched.registry().order(), &[a, b]);
    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![UiEvent::Advisory(
            "Cannot clear the queue while a job is running.".to_string()
        )]
    );

    status(&mut sched, corr(1), "completed", Some(0)).await;
    status(&mut sched, corr(2), "completed", Some(0)).await;
    assert!(sched.remove(a));
    sched.clear().unwrap();
    assert!(sched.registry().is_empty());
}

#[tokio::test]
async fn cancel_targets_the_current_phase() {
    let (mut sched, runner) = scheduler();
    assert!(matches!(sched.cancel().await, Err(QueueError::NotRunning)));

    sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    sched.cancel().await.unwrap();
    status(&mut sched, corr(1), "compressing", None).await;
    sched.cancel().await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls[1], Call::CancelDownload);
    assert_eq!(calls[2], Call::CancelCompression);
}

#[tokio::test]
async fn cancel_failure_is_reported_and_logged() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    runner.state.lock().unwrap().fail_cancel = true;

    assert!(matches!(sched.cancel().await, Err(QueueError::Runner(_))));
    assert_eq!(status_of(&sched, a), JobStatus::Running);
    let last = sched.registry().get(a).unwrap().log.last().unwrap();
    assert!(last.text.starts_with("Cancel failed"));
}

#[tokio::test]
async fn stale_correlation_never_changes_other_jobs() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    sched.start().await.unwrap();
    status(&mut sched, corr(1), "completed", Some(0)).await;
    assert_eq!(sched.registry().running(), Some(b));

    // late events for the finished job are dropped
    let logged = sched.registry().get(a).unwrap().log.len();
    status(&mut sched, corr(1), "error", None).await;
    line(&mut sched, corr(1), "late line").await;
    assert_eq!(status_of(&sched, a), JobStatus::Done);
    assert_eq!(status_of(&sched, b), JobStatus::Running);
    let log = &sched.registry().get(a).unwrap().log;
    assert_eq!(log.len(), logged);
    assert_ne!(log.last().unwrap().text, "late line");
    assert!(sched
        .registry()
        .get(b)
        .unwrap()
        .log
        .lines()
        .all(|l| l.text != "late line"));

    // unknown id while the running job already has one
    status(&mut sched, Some(CorrelationId::new("ghost")), "error", None).await;
    assert_eq!(status_of(&sched, b), JobStatus::Running);
}

#[tokio::test]
async fn untagged_events_go_to_running_job() {
    let (mut sched, _runner) = scheduler();
    let a = sched.enqueue(spec("1"));
    line(&mut sched, None, "nobody home").await;
    assert_eq!(sched.registry().get(a).unwrap().log.len(), 1);

    sched.start().await.unwrap();
    status(&mut sched, None, "compressing", None).await;
    assert_eq!(status_of(&sched, a), JobStatus::Compressing);
}

#[tokio::test]
async fn rejected_email_code_restarts_once() {
    let (mut sched, runner, mut rx) = with_ui();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();

    line(
        &mut sched,
        corr(1),
        "Please enter the Steam Guard code sent to your email at example.com:",
    )
    .await;
    assert!(sched.registry().get(a).unwrap().auth.email_pending());
    let events = drain(&mut rx);
    assert!(events.contains(&UiEvent::EmailCodeRequested {
        job: a,
        provider: Some("example.com".into())
    }));

    sched.submit_email_code("  ABCDE ").await.unwrap();
    assert!(runner.calls().contains(&Call::EmailCode("ABCDE".into())));

    line(&mut sched, corr(1), "Login failed: InvalidLoginAuthCode").await;
    line(&mut sched, corr(1), "The code you entered is incorrect").await;
    assert_eq!(sched.auth().retry_in_flight(), Some(a));
    let cancels = runner
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::CancelDownload))
        .count();
    assert_eq!(cancels, 1);

    status(&mut sched, corr(1), "exited", Some(1)).await;
    assert_eq!(sched.auth().retry_in_flight(), None);
    let job = sched.registry().get(a).unwrap();
    assert_eq!(job.status(), JobStatus::Running);
    assert_eq!(job.correlation_id(), corr(2).as_ref());
    assert_eq!(job.auth.email, crate::auth::EmailState::Idle);
}

#[tokio::test]
async fn rejected_code_restarts_when_downloader_already_exited() {
    let (mut sched, runner) = scheduler();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    runner.state.lock().unwrap().cancel_finds_nothing = true;

    line(
        &mut sched,
        corr(1),
        "Please enter the Steam Guard code sent to your email at example.com:",
    )
    .await;
    sched.submit_email_code("ABCDE").await.unwrap();
    line(&mut sched, corr(1), "The code you entered is incorrect").await;
    assert_eq!(sched.auth().retry_in_flight(), Some(a));
    assert_eq!(
        sched.registry().get(a).unwrap().auth.email,
        crate::auth::EmailState::RetryInFlight
    );

    status(&mut sched, corr(1), "exited", Some(1)).await;
    assert_eq!(sched.auth().retry_in_flight(), None);
    assert_eq!(status_of(&sched, a), JobStatus::Running);
    assert_eq!(runner.state.lock().unwrap().started, 2);
    assert_eq!(
        sched.registry().get(a).unwrap().correlation_id(),
        corr(2).as_ref()
    );
}

#[tokio::test]
async fn email_code_requires_an_open_prompt() {
    let (mut sched, _runner) = scheduler();
    assert!(matches!(
        sched.submit_email_code("   ").await,
        Err(QueueError::EmptyCode)
    ));
    assert!(matches!(
        sched.submit_email_code("X").await,
        Err(QueueError::NotRunning)
    ));
    sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    assert!(matches!(
        sched.submit_email_code("X").await,
        Err(QueueError::NoPendingEmailPrompt)
    ));
}

#[tokio::test]
async fn remembered_qr_login_is_reused_until_idle() {
    let (mut sched, runner) = scheduler();
    let qr = Credentials {
        qr_enabled: true,
        ..Credentials::default()
    };
    sched.enqueue(spec("1").with_credentials(qr.clone()));
    sched.enqueue(spec("2").with_credentials(qr.clone()));
    sched.start().await.unwrap();

    line(&mut sched, corr(1), "Use the Steam Mobile App to scan this QR code:").await;
    line(&mut sched, corr(1), "█▀▀▀▀▀█ ▄▄ █▀▀▀▀▀█").await;
    line(&mut sched, corr(1), "█ ███ █ ▀█ █ ███ █").await;
    line(&mut sched, corr(1), "Waiting for confirmation...").await;
    let job = sched.registry().get(sched.registry().order()[0]).unwrap();
    assert_eq!(
        job.qr_text.as_deref(),
        Some("█▀▀▀▀▀█ ▄▄ █▀▀▀▀▀█\n█ ███ █ ▀█ █ ███ █")
    );

    line(
        &mut sched,
        corr(1),
        "Use -username gaben -remember-password next time",
    )
    .await;
    assert_eq!(sched.auth().remembered_qr_username(), Some("gaben"));

    status(&mut sched, corr(1), "completed", Some(0)).await;
    let second_start = runner
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Start { credentials, .. } => Some(credentials),
            _ => None,
        })
        .nth(1)
        .unwrap();
    assert!(!second_start.qr_enabled);
    assert_eq!(second_start.username, "gaben");

    status(&mut sched, corr(2), "completed", Some(0)).await;
    assert_eq!(sched.auth().remembered_qr_username(), None);
}

#[tokio::test]
async fn missing_depots_warning_adds_a_hint() {
    let (mut sched, _runner, mut rx) = with_ui();
    let a = sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    line(&mut sched, corr(1), "Couldn't find any depots to download for app 440").await;

    let last = sched.registry().get(a).unwrap().log.last().unwrap();
    assert_eq!(last.stream, Stream::System);
    assert!(last.text.contains("No depots found for app 440"));
    assert!(drain(&mut rx).contains(&UiEvent::MissingDepots { job: a }));
}

fn conflict(c: &str, name: &str) -> OutputConflict {
    OutputConflict {
        correlation_id: CorrelationId::new(c),
        output_name: name.to_string(),
        output_path: format!("/out/{name}"),
    }
}

#[tokio::test]
async fn conflicts_are_answered_one_at_a_time() {
    let (mut sched, runner, mut rx) = with_ui();
    sched.enqueue(spec("440"));
    sched.start().await.unwrap();
    drain(&mut rx);

    for (c, name) in [("corr-1", "Game"), ("corr-1", "Game"), ("corr-9", "Other")] {
        sched
            .handle_download_event(DownloadEvent::OutputConflict(conflict(c, name)))
            .await;
    }
    assert_eq!(
        drain(&mut rx),
        vec![UiEvent::OutputConflict(conflict("corr-1", "Game"))]
    );
    assert_eq!(sched.conflicts().waiting(), 1);

    sched.resolve_conflict(ConflictChoice::Copy).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![UiEvent::OutputConflict(conflict("corr-9", "Other"))]
    );

    runner.state.lock().unwrap().fail_conflict = true;
    assert!(sched.resolve_conflict(ConflictChoice::Overwrite).await.is_err());
    assert_eq!(
        sched.conflicts().active().map(|c| c.output_name.as_str()),
        Some("Other")
    );

    runner.state.lock().unwrap().fail_conflict = false;
    sched.resolve_conflict(ConflictChoice::Cancel).await.unwrap();
    assert!(matches!(
        sched.resolve_conflict(ConflictChoice::Cancel).await,
        Err(QueueError::NoPendingConflict)
    ));
    assert_eq!(
        runner
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Conflict(..)))
            .count(),
        3
    );
}

#[tokio::test]
async fn select_forces_full_console_render() {
    let (mut sched, _runner, mut rx) = with_ui();
    sched.enqueue(spec("1"));
    let b = sched.enqueue(spec("2"));
    let now = Instant::now();
    assert_eq!(sched.flush_console(now), 2);
    drain(&mut rx);

    assert!(sched.select(b));
    assert_eq!(sched.registry().selected(), Some(b));
    let later = now + Duration::from_secs(1);
    assert_eq!(sched.flush_console(later), 1);
    let events = drain(&mut rx);
    assert!(matches!(
        &events[..],
        [UiEvent::Selected(id), UiEvent::Console { job, flush: crate::console::ConsoleFlush::Full(lines) }]
            if *id == b && *job == b && lines.len() == 1
    ));
    assert!(!sched.select(JobId(999)));
}

#[tokio::test]
async fn run_loop_processes_commands_and_events_in_order() {
    let runner = FakeRunner::default();
    let sched = QueueScheduler::new(runner.clone(), ConsoleConfig::default(), Notifier::disabled());
    let (events_tx, events_rx) = crate::runner::channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    cmd_tx.send(Command::Enqueue(spec("440"))).unwrap();
    cmd_tx.send(Command::Start).unwrap();
    let handle = tokio::spawn(sched.run(events_rx, cmd_rx, Duration::from_millis(5)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let c = CorrelationId::new("corr-1");
    events_tx.status(Some(&c), "compressing", None);
    events_tx.compression_progress(50);
    events_tx.status(Some(&c), "completed", Some(0));
    tokio::time::sleep(Duration::from_millis(20)).await;
    cmd_tx.send(Command::Shutdown).unwrap();

    let sched = handle.await.unwrap();
    let job = sched.registry().iter().next().unwrap();
    assert_eq!(job.status(), JobStatus::Done);
    assert!(!sched.is_running());
}
