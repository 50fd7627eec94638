use serde::{Deserialize, Serialize};

/// Payload format version written by [`TemplatePayload::default`].
pub const TEMPLATE_VERSION: u32 = 1;

/// One ordered piece of the release text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateBlock {
    Title { config: TextConfig },
    Version { config: TextConfig },
    DepotList { config: DepotListConfig },
    FreeText { config: FreeTextConfig },
    UploadedVersion { config: TextConfig },
}

impl TemplateBlock {
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateBlock::Title { .. } => "title",
            TemplateBlock::Version { .. } => "version",
            TemplateBlock::DepotList { .. } => "depot_list",
            TemplateBlock::FreeText { .. } => "free_text",
            TemplateBlock::UploadedVersion { .. } => "uploaded_version",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConfig {
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTextConfig {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotListConfig {
    /// Spoiler title; `Depots` when absent.
    #[serde(default)]
    pub title: Option<String>,
    pub line_template: String,
    #[serde(default)]
    pub use_code_block: Option<bool>,
    /// Lowers the depot limit for this block. Can never raise it.
    #[serde(default)]
    pub max_depots: Option<usize>,
}

/// Persisted template: a version tag plus the ordered blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePayload {
    pub version: u32,
    pub blocks: Vec<TemplateBlock>,
}

impl Default for TemplatePayload {
    fn default() -> Self {
        Self {
            version: TEMPLATE_VERSION,
            blocks: create_default_template(),
        }
    }
}

/// The stock release layout.
pub fn create_default_template() -> Vec<TemplateBlock> {
    let text = |s: &str| TextConfig {
        template: s.to_string(),
    };
    vec![
        TemplateBlock::Title {
            config: text("[url=][color=white][b]{{game_name}} [{{os}}] [Branch: {{branch}}] (Clean Steam Files)[/b][/color][/url]"),
        },
        TemplateBlock::Version {
            config: text("[size=85][color=white][b]Version:[/b] [i]{{build_datetime_utc}} [Build {{build_id}}][/i][/color][/size]"),
        },
        TemplateBlock::DepotList {
            config: DepotListConfig {
                title: Some("\"[color=white]Depots & Manifests[/color]\"".to_string()),
                line_template: "{{depot_id}} - {{depot_name}} [Manifest {{manifest_id}}]".to_string(),
                use_code_block: Some(true),
                max_depots: Some(100),
            },
        },
        TemplateBlock::UploadedVersion {
            config: text("[color=white][b]Uploaded version:[/b] [i]{{build_datetime_utc}} [Build {{build_id}}][/i][/color]"),
        },
        TemplateBlock::FreeText {
            config: FreeTextConfig {
                text: "Made using [url=https://github.com/elgreams/OmniPacker]OmniPacker[/url]".to_string(),
            },
        },
    ]
}
