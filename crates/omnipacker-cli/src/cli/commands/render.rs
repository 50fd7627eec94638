//! `omnipacker render` – render release notes for given metadata.

use anyhow::{Context, Result};
use omnipacker_core::config::OmniConfig;
use omnipacker_core::template::{store, TemplateMetadata, TemplateRenderer};
use std::path::Path;

use super::template::read_payload;

pub fn run_render(cfg: &OmniConfig, metadata: &Path, template: Option<&Path>) -> Result<()> {
    let data = std::fs::read_to_string(metadata)
        .with_context(|| format!("read {}", metadata.display()))?;
    let metadata: TemplateMetadata =
        serde_json::from_str(&data).context("parse metadata JSON")?;
    let payload = match template {
        Some(path) => read_payload(path)?,
        None => store::load_or_default(&store::default_path()?)?,
    };

    let text = TemplateRenderer::from_config(&cfg.template).render(&payload.blocks, &metadata)?;
    println!("{text}");
    Ok(())
}
