//! Persists the user's template payload as JSON under the XDG data dir.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::block::TemplatePayload;

const TEMPLATE_FILE: &str = "template.json";

/// `~/.local/share/omnipacker/template.json`
pub fn default_path() -> Result<PathBuf> {
    Ok(crate::paths::data_dir()?.join(TEMPLATE_FILE))
}

pub fn save_to_path(payload: &TemplatePayload, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(payload).context("serialize template")?;
    std::fs::write(path, json).with_context(|| format!("write template: {}", path.display()))?;
    Ok(())
}

/// `None` if no template was saved yet.
pub fn load_from_path(path: &Path) -> Result<Option<TemplatePayload>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read template: {}", path.display())),
    };
    let payload = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse template: {}", path.display()))?;
    Ok(Some(payload))
}

/// Saved payload, or the stock template when none exists.
pub fn load_or_default(path: &Path) -> Result<TemplatePayload> {
    Ok(load_from_path(path)?.unwrap_or_default())
}

/// Removes the saved payload so the stock template applies again.
pub fn reset(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove template: {}", path.display())),
    }
}
