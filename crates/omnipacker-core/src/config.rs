use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Console log retention and flush cadence (`[console]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Maximum number of lines retained per job.
    pub max_lines: usize,
    /// Lines allowed above `max_lines` before the oldest are dropped in one batch.
    pub drop_margin: usize,
    /// Minimum interval between two console flushes, in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_lines: 5000,
            drop_margin: 500,
            flush_interval_ms: 100,
        }
    }
}

impl ConsoleConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }
}

/// External programs and output location (`[runner]` in config.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Downloader executable; `DepotDownloader` on PATH when unset.
    pub downloader: Option<PathBuf>,
    /// Archiver executable; `7z` on PATH when unset.
    pub archiver: Option<PathBuf>,
    /// Where finished downloads land; XDG data dir `downloads/` when unset.
    pub output_dir: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn downloader_program(&self) -> PathBuf {
        self.downloader
            .clone()
            .unwrap_or_else(|| PathBuf::from("DepotDownloader"))
    }

    pub fn archiver_program(&self) -> PathBuf {
        self.archiver.clone().unwrap_or_else(|| PathBuf::from("7z"))
    }

    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::paths::default_output_dir(),
        }
    }
}

/// Release-notes rendering limits (`[template]` in config.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Override for the maximum composed output length, in characters.
    pub max_output_chars: Option<usize>,
}

/// Global configuration loaded from `~/.config/omnipacker/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OmniConfig {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub template: TemplateConfig,
}

pub fn config_path() -> Result<PathBuf> {
    crate::paths::config_file()
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<OmniConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = OmniConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: OmniConfig = toml::from_str(&data)?;
    Ok(cfg)
}
