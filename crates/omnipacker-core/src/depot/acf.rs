//! `appmanifest_<appid>.acf`, the Valve KeyValues file that lets a Steam
//! library pick up an installed app.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::metadata::JobMetadataFile;
use super::names::{is_shared_depot, shared_depot_owner};

#[derive(Default)]
struct KeyValues {
    out: String,
    depth: usize,
}

impl KeyValues {
    fn indent(&mut self) {
        self.out.extend(std::iter::repeat('\t').take(self.depth));
    }

    fn pair(&mut self, key: &str, value: &str) {
        self.indent();
        self.out.push_str(&format!("\"{key}\"\t\t\"{value}\"\n"));
    }

    fn open(&mut self, name: &str) {
        self.indent();
        self.out.push_str(&format!("\"{name}\"\n"));
        self.indent();
        self.out.push_str("{\n");
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("}\n");
    }
}

/// Total size of every file below `path`; unreadable entries count as zero.
pub fn size_on_disk(path: &Path) -> u64 {
    if path.is_file() {
        return fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| size_on_disk(&e.path()))
        .sum()
}

/// Sizes are read from `common_dir/<depot folder>`. `manifests` maps depot id
/// to the manifest actually installed and overrides the metadata's manifest.
/// `LastOwner` is always `0`, so the file names no account.
pub fn app_manifest(
    metadata: &JobMetadataFile,
    common_dir: &Path,
    install_dir: &str,
    folder_of: impl Fn(&str) -> String,
    manifests: &HashMap<String, String>,
) -> String {
    let last_updated = metadata.effective_datetime().timestamp();
    let manifest_of = |depot_id: &str, fallback: &str| -> String {
        manifests
            .get(depot_id)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    };

    let mut kv = KeyValues::default();
    kv.open("AppState");
    kv.pair("appid", &metadata.appid);
    kv.pair("universe", "1");
    kv.pair("name", &metadata.game_name);
    kv.pair("StateFlags", "4");
    kv.pair("installdir", install_dir);
    kv.pair("LastUpdated", &last_updated.to_string());
    kv.pair("UpdateResult", "0");
    kv.pair("SizeOnDisk", &size_on_disk(common_dir).to_string());
    kv.pair("buildid", &metadata.build_id);
    kv.pair("LastOwner", "0");
    kv.pair("BytesToDownload", "0");
    kv.pair("BytesDownloaded", "0");
    kv.pair("AutoUpdateBehavior", "0");
    kv.pair("AllowOtherDownloadsWhileRunning", "0");
    kv.pair("ScheduledAutoUpdate", "0");

    kv.open("UserConfig");
    kv.pair("language", "english");
    kv.close();

    kv.open("InstalledDepots");
    for depot in metadata.depots.iter().filter(|d| !is_shared_depot(&d.depot_id)) {
        let size = size_on_disk(&common_dir.join(folder_of(&depot.depot_name)));
        kv.open(&depot.depot_id);
        kv.pair("manifest", &manifest_of(&depot.depot_id, &depot.manifest_id));
        kv.pair("size", &size.to_string());
        kv.close();
    }
    kv.close();

    let mut shared = metadata
        .depots
        .iter()
        .filter(|d| is_shared_depot(&d.depot_id))
        .peekable();
    if shared.peek().is_some() {
        kv.open("SharedDepots");
        for depot in shared {
            kv.pair(&depot.depot_id, shared_depot_owner(&depot.depot_id));
        }
        kv.close();
    }

    kv.open("MountedDepots");
    for depot in &metadata.depots {
        kv.pair(&depot.depot_id, &manifest_of(&depot.depot_id, &depot.manifest_id));
    }
    kv.close();

    kv.close();
    kv.out
}

/// Writes `steamapps/appmanifest_<appid>.acf` and returns its path.
pub fn write_app_manifest(
    steamapps: &Path,
    metadata: &JobMetadataFile,
    install_dir: &str,
    folder_of: impl Fn(&str) -> String,
    manifests: &HashMap<String, String>,
) -> Result<PathBuf> {
    let text = app_manifest(
        metadata,
        &steamapps.join("common"),
        install_dir,
        folder_of,
        manifests,
    );
    let path = steamapps.join(format!("appmanifest_{}.acf", metadata.appid));
    fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
