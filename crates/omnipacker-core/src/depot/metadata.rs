use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::names::{depot_name, fallback_game_name, is_shared_depot};
use super::scan::ManifestSummary;
use crate::runner::StartRequest;
use crate::template::{format_build_datetime, TemplateDepot, TemplateMetadata};

pub const METADATA_VERSION: &str = "1.0.0";
pub const METADATA_FILE: &str = "job.json";
const UNKNOWN_BUILD: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildIdSource {
    /// Reported by the downloader for the app.
    AppBuildid,
    /// The primary depot's manifest id stands in.
    PrimaryManifestId,
    Unknown,
}

/// One `depots/<depot_id>/<manifest_id>/` directory in a staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDepot {
    pub depot_id: String,
    pub manifest_id: String,
}

/// Depot directories the downloader left under `<staging>/depots`, sorted.
/// A missing `depots` directory yields an empty list.
pub fn staged_depots(staging: &Path) -> Result<Vec<StagedDepot>> {
    let root = staging.join("depots");
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for depot in fs::read_dir(&root).with_context(|| format!("read {}", root.display()))? {
        let depot = depot?;
        let depot_id = depot.file_name().to_string_lossy().into_owned();
        if !depot.file_type()?.is_dir() || depot_id.starts_with('.') {
            continue;
        }
        for manifest in fs::read_dir(depot.path())? {
            let manifest = manifest?;
            let manifest_id = manifest.file_name().to_string_lossy().into_owned();
            if manifest.file_type()?.is_dir() && !manifest_id.starts_with('.') {
                found.push(StagedDepot {
                    depot_id: depot_id.clone(),
                    manifest_id,
                });
            }
        }
    }
    found.sort_by(|a, b| (&a.depot_id, &a.manifest_id).cmp(&(&b.depot_id, &b.manifest_id)));
    Ok(found)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotRecord {
    pub depot_id: String,
    pub depot_name: String,
    pub manifest_id: String,
}

/// `job.json`: what finalization and release notes were built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadataFile {
    pub job_id: String,
    pub appid: String,
    pub branch: String,
    pub platform: String,
    pub primary_depot_id: String,
    pub game_name: String,
    pub build_id: String,
    pub build_id_source: BuildIdSource,
    /// RFC 3339, UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_datetime_utc: Option<String>,
    pub depots: Vec<DepotRecord>,
    /// RFC 3339, UTC.
    pub resolved_at: String,
    pub metadata_version: String,
}

impl JobMetadataFile {
    /// Combines what the downloader printed with what it actually left on disk.
    /// Staged depots win; printed depots are used only when nothing was staged.
    pub fn resolve(
        job_id: &str,
        request: &StartRequest,
        summary: &ManifestSummary,
        staged: &[StagedDepot],
        now: DateTime<Utc>,
    ) -> Self {
        let game_name = fallback_game_name(&request.app_id);
        let mut depots: Vec<(String, String)> = staged
            .iter()
            .map(|d| (d.depot_id.clone(), d.manifest_id.clone()))
            .collect();
        if depots.is_empty() {
            depots = summary
                .depots
                .iter()
                .map(|d| (d.depot_id.clone(), d.manifest_id.clone()))
                .collect();
        }

        let primary_depot_id = summary
            .primary_depot_id
            .clone()
            .filter(|p| depots.iter().any(|(id, _)| id == p))
            .or_else(|| {
                depots
                    .iter()
                    .find(|(id, _)| !is_shared_depot(id))
                    .or_else(|| depots.first())
                    .map(|(id, _)| id.clone())
            })
            .unwrap_or_default();

        let (build_id, build_id_source) = match &summary.build_id {
            Some(id) => (id.clone(), BuildIdSource::AppBuildid),
            None => match depots.iter().find(|(id, _)| *id == primary_depot_id) {
                Some((_, manifest)) => (manifest.clone(), BuildIdSource::PrimaryManifestId),
                None => (UNKNOWN_BUILD.to_string(), BuildIdSource::Unknown),
            },
        };

        let depots = depots
            .into_iter()
            .map(|(depot_id, manifest_id)| DepotRecord {
                depot_name: summary
                    .depot_name(&depot_id)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        depot_name(&depot_id, depot_id == primary_depot_id, &game_name)
                    }),
                depot_id,
                manifest_id,
            })
            .collect();

        Self {
            job_id: job_id.to_string(),
            appid: request.app_id.clone(),
            branch: capitalize_first(&request.branch),
            platform: request.os.platform_name().to_string(),
            primary_depot_id,
            game_name,
            build_id,
            build_id_source,
            build_datetime_utc: summary.build_datetime.map(rfc3339),
            depots,
            resolved_at: rfc3339(now),
            metadata_version: METADATA_VERSION.to_string(),
        }
    }

    pub fn build_datetime(&self) -> Option<DateTime<Utc>> {
        parse_rfc3339(self.build_datetime_utc.as_deref()?)
    }

    /// Release timestamp, or the resolve time when the build time is unknown.
    pub fn effective_datetime(&self) -> DateTime<Utc> {
        self.build_datetime()
            .or_else(|| parse_rfc3339(&self.resolved_at))
            .unwrap_or_else(Utc::now)
    }

    pub fn template_metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            game_name: self.game_name.clone(),
            os: self.platform.clone(),
            branch: self.branch.clone(),
            build_datetime_utc: format_build_datetime(self.effective_datetime()),
            build_id: self.build_id.clone(),
            depots: self
                .depots
                .iter()
                .map(|d| TemplateDepot {
                    depot_id: d.depot_id.clone(),
                    depot_name: d.depot_name.clone(),
                    manifest_id: d.manifest_id.clone(),
                })
                .collect(),
        }
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self).context("serialize job metadata")?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(METADATA_FILE);
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
