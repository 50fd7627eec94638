//! `omnipacker template` – manage the saved release-notes template.

use anyhow::{Context, Result};
use omnipacker_core::template::{
    store, TemplateDepot, TemplateError, TemplateMetadata, TemplatePayload, TemplateRenderer,
};
use std::path::Path;

use crate::cli::TemplateAction;

pub fn run_template(action: TemplateAction) -> Result<()> {
    let path = store::default_path()?;
    match action {
        TemplateAction::Show => {
            let payload = store::load_or_default(&path)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        TemplateAction::Save { file } => {
            let payload = read_payload(&file)?;
            check_placeholders(&payload)?;
            store::save_to_path(&payload, &path)?;
            println!(
                "Saved template ({} block(s)) to {}",
                payload.blocks.len(),
                path.display()
            );
        }
        TemplateAction::Reset => {
            if store::reset(&path)? {
                println!("Template reset to default.");
            } else {
                println!("No saved template; the default is already in use.");
            }
        }
    }
    Ok(())
}

pub(super) fn read_payload(file: &Path) -> Result<TemplatePayload> {
    let data =
        std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parse template {}", file.display()))
}

/// Renders against sample metadata so unknown placeholders are caught before saving.
fn check_placeholders(payload: &TemplatePayload) -> Result<()> {
    let sample = TemplateMetadata {
        game_name: "Sample".into(),
        os: "Win64".into(),
        branch: "public".into(),
        build_datetime_utc: "January 1, 2026 - 00:00:00 UTC".into(),
        build_id: "0".into(),
        depots: vec![TemplateDepot {
            depot_id: "1".into(),
            depot_name: "Depot 1".into(),
            manifest_id: "1".into(),
        }],
    };
    match TemplateRenderer::new(usize::MAX).render(&payload.blocks, &sample) {
        Ok(_) => Ok(()),
        Err(e @ TemplateError::UnsupportedPlaceholders { .. }) => Err(e.into()),
        Err(e) => {
            tracing::debug!("template sample render: {}", e);
            Ok(())
        }
    }
}
