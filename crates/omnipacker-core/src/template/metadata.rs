use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDepot {
    pub depot_id: String,
    pub depot_name: String,
    pub manifest_id: String,
}

/// Values a template can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub game_name: String,
    pub os: String,
    pub branch: String,
    pub build_datetime_utc: String,
    pub build_id: String,
    #[serde(default)]
    pub depots: Vec<TemplateDepot>,
}

impl TemplateMetadata {
    /// Value of a single-field placeholder, or `None` for names outside that set.
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "game_name" => &self.game_name,
            "os" => &self.os,
            "branch" => &self.branch,
            "build_datetime_utc" => &self.build_datetime_utc,
            "build_id" => &self.build_id,
            _ => return None,
        };
        Some(value)
    }
}

impl TemplateDepot {
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "depot_id" => &self.depot_id,
            "depot_name" => &self.depot_name,
            "manifest_id" => &self.manifest_id,
            _ => return None,
        };
        Some(value)
    }
}

/// `February 24, 2025 - 22:02:36 UTC`
pub fn format_build_datetime(ts: DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y - %H:%M:%S UTC").to_string()
}
