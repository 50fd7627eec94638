//! Depot facts for a finished download: what the downloader reported, what
//! it left in staging, and the Steam library files built from both.

mod acf;
mod metadata;
mod names;
mod scan;

pub use acf::{app_manifest, size_on_disk, write_app_manifest};
pub use metadata::{
    staged_depots, BuildIdSource, DepotRecord, JobMetadataFile, StagedDepot, METADATA_FILE,
    METADATA_VERSION,
};
pub use names::{
    depot_name, fallback_game_name, is_shared_depot, sanitize_game_name, shared_depot_owner,
};
pub use scan::{ManifestScan, ManifestSummary, ScannedDepot};
