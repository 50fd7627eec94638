//! `omnipacker run` – process a jobs file through the queue.

use anyhow::{bail, Context, Result};
use omnipacker_core::config::OmniConfig;
use omnipacker_core::credentials::{CredentialStore, SavedLogin};
use omnipacker_core::job::{JobSpec, JobStatus};
use omnipacker_core::runner;
use omnipacker_core::scheduler::{Command, Notifier, QueueScheduler, UiEvent};
use serde::Deserialize;
use std::path::Path;
use tokio::sync::mpsc;

use crate::cli::control_input;
use crate::cli::process_runner::{ProcessRunner, RunnerSettings};
use crate::cli::queue_view::QueueView;

#[derive(Debug, Default, Deserialize)]
struct JobsFile {
    #[serde(default, rename = "job")]
    jobs: Vec<JobSpec>,
}

pub(crate) fn load_jobs(path: &Path) -> Result<Vec<JobSpec>> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let file: JobsFile =
        toml::from_str(&data).with_context(|| format!("parse jobs file {}", path.display()))?;
    Ok(file.jobs)
}

/// Fills login fields the jobs file left empty. QR jobs are left alone.
pub(crate) fn apply_saved_login(jobs: &mut [JobSpec], login: &SavedLogin) -> usize {
    let mut filled = 0;
    for job in jobs.iter_mut().filter(|j| !j.credentials.qr_enabled) {
        let creds = &mut job.credentials;
        if creds.username.trim().is_empty() {
            creds.username = login.username.clone();
            creds.password = login.password.clone();
            filled += 1;
        } else if creds.username.trim() == login.username && creds.password.is_empty() {
            creds.password = login.password.clone();
            filled += 1;
        }
    }
    filled
}

pub async fn run_queue(cfg: &OmniConfig, jobs_file: &Path, saved_login: bool) -> Result<()> {
    let mut specs = load_jobs(jobs_file)?;
    if specs.is_empty() {
        println!("No jobs in {}.", jobs_file.display());
        return Ok(());
    }
    if saved_login {
        match CredentialStore::open_default()?.load()? {
            Some(login) => {
                let n = apply_saved_login(&mut specs, &login);
                tracing::info!("saved login applied to {} job(s)", n);
            }
            None => println!("No saved login; jobs run with the credentials in the file."),
        }
    }

    let settings = RunnerSettings::from_config(cfg)?;
    println!("Output directory: {}", settings.output_dir.display());

    let (events_tx, events_rx) = runner::channel();
    let runner = ProcessRunner::new(settings, events_tx);
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let mut sched = QueueScheduler::new(runner, cfg.console.clone(), Notifier::new(ui_tx));
    for spec in specs {
        sched.enqueue(spec);
    }

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let _ = cmd_tx.send(Command::Start);
    if let Err(e) = control_input::spawn_stdin_reader(cmd_tx.clone()) {
        tracing::warn!("stdin control unavailable: {}", e);
    }

    let printer_tx = cmd_tx;
    let printer = tokio::spawn(async move {
        let mut view = QueueView::default();
        while let Some(event) = ui_rx.recv().await {
            for line in view.render(&event) {
                println!("{line}");
            }
            if matches!(event, UiEvent::QueueIdle) {
                let _ = printer_tx.send(Command::Shutdown);
            }
        }
    });

    let sched = sched
        .run(events_rx, cmd_rx, cfg.console.flush_interval())
        .await;

    let rows: Vec<_> = sched
        .registry()
        .iter()
        .map(|j| {
            (
                j.id().to_string(),
                j.status(),
                j.spec.app_id.clone(),
                j.spec.os.platform_name(),
                j.spec.branch.clone(),
            )
        })
        .collect();
    drop(sched);
    let _ = printer.await;

    println!();
    println!("{:<8} {:<12} {:<12} {:<12} {}", "ID", "STATUS", "OS", "BRANCH", "APP");
    for (id, status, app, os, branch) in &rows {
        println!(
            "{:<8} {:<12} {:<12} {:<12} {}",
            id,
            status.as_str(),
            os,
            branch,
            app
        );
    }

    let failed = rows
        .iter()
        .filter(|(_, s, ..)| *s == JobStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} job(s) failed", failed, rows.len());
    }
    tracing::info!("run completed {} job(s)", rows.len());
    Ok(())
}
