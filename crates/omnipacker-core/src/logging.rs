//! Tracing setup for the CLI: an append-only log file in the XDG state dir,
//! with stderr as the fallback target.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,omnipacker=debug";
const LOG_FILE: &str = "omnipacker.log";

/// Filter directives: `RUST_LOG` when set and non-blank, else the default.
fn filter_directives(from_env: Option<String>) -> String {
    from_env
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    let directives = filter_directives(std::env::var("RUST_LOG").ok());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Creates `dir` if needed and opens its log file for appending.
pub fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    Ok((file, path))
}

fn install<W>(writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install tracing subscriber: {e}"))
}

/// Logs to `$XDG_STATE_HOME/omnipacker/omnipacker.log` and returns that path.
/// An error leaves no subscriber installed, so the caller can use stderr.
pub fn init_logging() -> Result<PathBuf> {
    let (file, path) = open_log_file(&crate::paths::state_dir()?)?;
    install(Mutex::new(file))?;
    tracing::info!("omnipacker logging initialized at {}", path.display());
    Ok(path)
}

pub fn init_logging_stderr() {
    if let Err(e) = install(std::io::stderr) {
        eprintln!("omnipacker: {e:#}");
    }
}
