//! XDG locations for state, config and data files.

use anyhow::Result;
use std::path::PathBuf;

const PREFIX: &str = "omnipacker";

fn base_dirs() -> Result<xdg::BaseDirectories> {
    Ok(xdg::BaseDirectories::with_prefix(PREFIX)?)
}

/// `~/.local/state/omnipacker` (log file lives here).
pub fn state_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.get_state_home())
}

/// `~/.local/share/omnipacker` (template payload, saved login).
pub fn data_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.get_data_home())
}

/// `~/.config/omnipacker/config.toml`, creating the parent directory if needed.
pub fn config_file() -> Result<PathBuf> {
    Ok(base_dirs()?.place_config_file("config.toml")?)
}

/// Default output directory for finished downloads and archives.
pub fn default_output_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("downloads"))
}
