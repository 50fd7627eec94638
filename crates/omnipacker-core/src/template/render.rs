use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::block::{DepotListConfig, TemplateBlock};
use super::error::TemplateError;
use super::metadata::{TemplateDepot, TemplateMetadata};
use crate::config::TemplateConfig;

/// Hard cap on depots in one list. A block's `maxDepots` may only lower it.
pub const MAX_DEPOTS: usize = 100;
pub const MAX_OUTPUT_CHARS: usize = 50_000;

pub const SINGLE_FIELDS: &[&str] = &["game_name", "os", "branch", "build_datetime_utc", "build_id"];
pub const DEPOT_FIELDS: &[&str] = &["depot_id", "depot_name", "manifest_id"];

const DEFAULT_DEPOT_TITLE: &str = "Depots";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("static regex"))
}

/// Renders blocks with a configurable output limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRenderer {
    max_output_chars: usize,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self {
            max_output_chars: MAX_OUTPUT_CHARS,
        }
    }
}

impl TemplateRenderer {
    pub fn new(max_output_chars: usize) -> Self {
        Self { max_output_chars }
    }

    pub fn from_config(cfg: &TemplateConfig) -> Self {
        Self::new(cfg.max_output_chars.unwrap_or(MAX_OUTPUT_CHARS))
    }

    pub fn max_output_chars(&self) -> usize {
        self.max_output_chars
    }

    pub fn render(
        &self,
        blocks: &[TemplateBlock],
        metadata: &TemplateMetadata,
    ) -> Result<String, TemplateError> {
        let mut output = String::new();
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                output.push_str(separator(&blocks[i - 1], block));
            }
            output.push_str(&render_block(block, metadata)?);
        }

        let len = output.chars().count();
        if len > self.max_output_chars {
            return Err(TemplateError::OutputTooLong {
                len,
                max: self.max_output_chars,
            });
        }
        Ok(output)
    }
}

/// Renders with the default limits.
pub fn render_template(
    blocks: &[TemplateBlock],
    metadata: &TemplateMetadata,
) -> Result<String, TemplateError> {
    TemplateRenderer::default().render(blocks, metadata)
}

fn separator(prev: &TemplateBlock, next: &TemplateBlock) -> &'static str {
    match (prev, next) {
        (TemplateBlock::Version { .. }, TemplateBlock::DepotList { .. }) => "\n\n",
        (TemplateBlock::DepotList { .. }, TemplateBlock::UploadedVersion { .. }) => "",
        _ => "\n",
    }
}

fn render_block(block: &TemplateBlock, metadata: &TemplateMetadata) -> Result<String, TemplateError> {
    let kind = block.type_name();
    match block {
        TemplateBlock::Title { config }
        | TemplateBlock::Version { config }
        | TemplateBlock::UploadedVersion { config } => {
            substitute(kind, &config.template, |name| metadata.field(name))
        }
        TemplateBlock::FreeText { config } => substitute(kind, &config.text, |name| metadata.field(name)),
        TemplateBlock::DepotList { config } => render_depot_list(config, &metadata.depots),
    }
}

fn render_depot_list(config: &DepotListConfig, depots: &[TemplateDepot]) -> Result<String, TemplateError> {
    // Validate the line template even before looking at the depots.
    let unsupported = unsupported_tokens(&config.line_template, DEPOT_FIELDS);
    if !unsupported.is_empty() {
        return Err(TemplateError::UnsupportedPlaceholders {
            block: "depot_list",
            tokens: unsupported,
        });
    }
    if depots.is_empty() {
        return Err(TemplateError::NoDepots);
    }
    let max = config.max_depots.map_or(MAX_DEPOTS, |m| m.min(MAX_DEPOTS));
    if depots.len() > max {
        return Err(TemplateError::TooManyDepots {
            count: depots.len(),
            max,
        });
    }

    let mut lines = Vec::with_capacity(depots.len());
    for depot in depots {
        lines.push(substitute("depot_list", &config.line_template, |name| depot.field(name))?);
    }

    let title = config.title.as_deref().unwrap_or(DEFAULT_DEPOT_TITLE);
    let code = config.use_code_block.unwrap_or(false);
    let mut out = format!("[spoiler={title}]\n");
    if code {
        out.push_str("[code=text]");
    }
    out.push_str(&lines.join("\n"));
    if code {
        out.push_str("[/code]");
    }
    out.push_str("\n[/spoiler]");
    Ok(out)
}

/// Distinct placeholder names not in `allowed`, in order of first appearance.
fn unsupported_tokens(template: &str, allowed: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in placeholder_re().captures_iter(template) {
        let name = &caps[1];
        if !allowed.contains(&name) && !out.iter().any(|t| t == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn substitute<'a>(
    block: &'static str,
    template: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> Result<String, TemplateError> {
    let mut unsupported: Vec<String> = Vec::new();
    let rendered = placeholder_re().replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value.to_string(),
            None => {
                if !unsupported.iter().any(|t| t == name) {
                    unsupported.push(name.to_string());
                }
                String::new()
            }
        }
    });
    if !unsupported.is_empty() {
        return Err(TemplateError::UnsupportedPlaceholders {
            block,
            tokens: unsupported,
        });
    }
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::block::{create_default_template, FreeTextConfig, TextConfig};

    fn meta(depots: usize) -> TemplateMetadata {
        TemplateMetadata {
            game_name: "Balatro".into(),
            os: "Win64".into(),
            branch: "public".into(),
            build_datetime_utc: "February 24, 2025 - 22:02:36 UTC".into(),
            build_id: "18674832".into(),
            depots: (0..depots)
                .map(|i| TemplateDepot {
                    depot_id: format!("29233{i:02}"),
                    depot_name: format!("Content {i}"),
                    manifest_id: format!("48518066562046799{i:02}"),
                })
                .collect(),
        }
    }

    fn title(t: &str) -> TemplateBlock {
        TemplateBlock::Title {
            config: TextConfig { template: t.into() },
        }
    }

    fn version(t: &str) -> TemplateBlock {
        TemplateBlock::Version {
            config: TextConfig { template: t.into() },
        }
    }

    fn uploaded(t: &str) -> TemplateBlock {
        TemplateBlock::UploadedVersion {
            config: TextConfig { template: t.into() },
        }
    }

    fn depots(line: &str, code: bool, max: Option<usize>) -> TemplateBlock {
        TemplateBlock::DepotList {
            config: DepotListConfig {
                title: None,
                line_template: line.into(),
                use_code_block: Some(code),
                max_depots: max,
            },
        }
    }

    #[test]
    fn single_fields_are_substituted() {
        let out = render_template(&[title("{{game_name}} [{{ os }}] {{branch}}")], &meta(1)).unwrap();
        assert_eq!(out, "Balatro [Win64] public");
    }

    #[test]
    fn separators_follow_block_pairs() {
        let blocks = [
            title("T"),
            version("V"),
            depots("{{depot_id}}", false, None),
            uploaded("U"),
            TemplateBlock::FreeText {
                config: FreeTextConfig { text: "F".into() },
            },
        ];
        let out = render_template(&blocks, &meta(1)).unwrap();
        assert_eq!(out, "T\nV\n\n[spoiler=Depots]\n2923300\n[/spoiler]U\nF");
    }

    #[test]
    fn depot_list_wraps_lines_in_code_block() {
        let out = render_template(&[depots("{{depot_name}}: {{manifest_id}}", true, None)], &meta(2)).unwrap();
        assert_eq!(
            out,
            "[spoiler=Depots]\n[code=text]Content 0: 4851806656204679900\nContent 1: 4851806656204679901[/code]\n[/spoiler]"
        );
    }

    #[test]
    fn unsupported_tokens_are_all_named_once() {
        let err = render_template(&[title("{{game_name}} {{version}} {{depot_id}} {{version}}")], &meta(1))
            .unwrap_err();
        match err {
            TemplateError::UnsupportedPlaceholders { block, tokens } => {
                assert_eq!(block, "title");
                assert_eq!(tokens, vec!["version".to_string(), "depot_id".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn depot_line_rejects_single_value_fields() {
        let err = render_template(&[depots("{{depot_id}} {{game_name}}", false, None)], &meta(1)).unwrap_err();
        match err {
            TemplateError::UnsupportedPlaceholders { block, tokens } => {
                assert_eq!(block, "depot_list");
                assert_eq!(tokens, vec!["game_name".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_depots_fail_instead_of_empty_spoiler() {
        let err = render_template(&create_default_template(), &meta(0)).unwrap_err();
        assert!(matches!(err, TemplateError::NoDepots));
    }

    #[test]
    fn depot_limit_is_capped() {
        let err = render_template(&[depots("{{depot_id}}", false, Some(500))], &meta(101)).unwrap_err();
        assert!(matches!(err, TemplateError::TooManyDepots { count: 101, max: 100 }));

        let err = render_template(&[depots("{{depot_id}}", false, Some(2))], &meta(3)).unwrap_err();
        assert!(matches!(err, TemplateError::TooManyDepots { count: 3, max: 2 }));

        assert!(render_template(&[depots("{{depot_id}}", false, None)], &meta(100)).is_ok());
    }

    #[test]
    fn output_length_limit_counts_characters() {
        let renderer = TemplateRenderer::new(10);
        assert!(renderer.render(&[title("ééééééééé")], &meta(1)).is_ok());
        let err = renderer.render(&[title("{{game_name}}{{game_name}}")], &meta(1)).unwrap_err();
        assert!(matches!(err, TemplateError::OutputTooLong { len: 14, max: 10 }));
    }

    #[test]
    fn rendering_is_deterministic() {
        let blocks = create_default_template();
        let first = render_template(&blocks, &meta(3)).unwrap();
        let second = render_template(&blocks, &meta(3)).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("[url=][color=white][b]Balatro [Win64] [Branch: public]"));
        assert!(first.contains("[/spoiler][color=white][b]Uploaded version:[/b]"));
    }

    #[test]
    fn field_lists_match_metadata_lookups() {
        let m = meta(1);
        assert!(SINGLE_FIELDS.iter().all(|f| m.field(f).is_some()));
        assert!(DEPOT_FIELDS.iter().all(|f| m.depots[0].field(f).is_some()));
        assert!(m.field("depot_id").is_none());
    }

    #[test]
    fn config_overrides_output_limit() {
        let cfg = TemplateConfig {
            max_output_chars: Some(5),
        };
        assert_eq!(TemplateRenderer::from_config(&cfg).max_output_chars(), 5);
        assert_eq!(
            TemplateRenderer::from_config(&TemplateConfig::default()).max_output_chars(),
            MAX_OUTPUT_CHARS
        );
    }
}
