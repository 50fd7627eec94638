//! Staging-to-output moves and the Steam library layout of a finished download.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omnipacker_core::depot::{self, JobMetadataFile};
use omnipacker_core::runner::StartRequest;

const MAX_COPY_SUFFIX: u32 = 9999;
const DOWNLOADER_DIR: &str = ".DepotDownloader";

/// `raw` with path-hostile characters replaced by `_`.
pub(super) fn path_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `<app>.<platform>.<branch>`, path-safe.
pub(super) fn output_name(request: &StartRequest) -> String {
    path_safe(&format!(
        "{}.{}.{}",
        request.app_id,
        request.os.platform_name(),
        request.branch
    ))
}

pub(super) fn archive_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".7z");
    PathBuf::from(name)
}

/// First `<base> (n)` that is free (and whose archive is free when compressing).
pub(super) fn copy_candidate(base: &Path, compress: bool) -> Option<PathBuf> {
    (1..=MAX_COPY_SUFFIX)
        .map(|n| {
            let mut name = base.as_os_str().to_os_string();
            name.push(format!(" ({n})"));
            PathBuf::from(name)
        })
        .find(|p| !p.exists() && !(compress && archive_path(p).exists()))
}

/// Lays the staged depots out as a Steam library under `dest`:
/// `steamapps/common/<depot name>/` per depot, the downloader's `.manifest`
/// files in `depotcache/`, and `steamapps/appmanifest_<appid>.acf`.
/// Depot contents are moved out of staging. Returns the app manifest path.
pub(super) fn build_library(
    staging: &Path,
    dest: &Path,
    metadata: &JobMetadataFile,
) -> Result<PathBuf> {
    let steamapps = dest.join("steamapps");
    let common = steamapps.join("common");
    let depotcache = dest.join("depotcache");
    for dir in [&common, &depotcache] {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let mut installed: HashMap<String, String> = HashMap::new();
    for record in &metadata.depots {
        let source = staging
            .join("depots")
            .join(&record.depot_id)
            .join(&record.manifest_id);
        if !source.is_dir() {
            tracing::debug!(depot = %record.depot_id, "depot not staged; left out of library");
            continue;
        }

        let tool_dir = source.join(DOWNLOADER_DIR);
        if tool_dir.is_dir() {
            for entry in fs::read_dir(&tool_dir)
                .with_context(|| format!("read {}", tool_dir.display()))?
            {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let Some(manifest_id) = name.strip_suffix(".manifest") else {
                    continue;
                };
                if !entry.file_type()?.is_file() {
                    continue;
                }
                installed.insert(record.depot_id.clone(), manifest_id.to_string());
                fs::copy(entry.path(), depotcache.join(&name))
                    .with_context(|| format!("copy {name} to depotcache"))?;
            }
            fs::remove_dir_all(&tool_dir)
                .with_context(|| format!("remove {}", tool_dir.display()))?;
        }

        move_into_place(&source, &common.join(path_safe(&record.depot_name)))?;
    }

    let install_dir = depot::sanitize_game_name(&metadata.game_name);
    depot::write_app_manifest(
        &steamapps,
        metadata,
        &install_dir,
        |name: &str| path_safe(name),
        &installed,
    )
}

/// Moves the staging contents to `dest`. Falls back to copy-and-delete when a
/// rename is not possible (e.g. across filesystems).
pub(super) fn move_into_place(staging: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    if fs::rename(staging, dest).is_ok() {
        return Ok(());
    }
    copy_dir(staging, dest)?;
    fs::remove_dir_all(staging).with_context(|| format!("remove {}", staging.display()))?;
    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy to {}", target.display()))?;
        }
    }
    Ok(())
}

/// Removes a previous output, file or directory. Missing paths are fine.
pub(super) fn remove_existing(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.with_context(|| format!("remove existing output {}", path.display()))
}
