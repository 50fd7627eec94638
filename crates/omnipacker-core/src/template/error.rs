use std::path::PathBuf;

/// A single validation or output failure. Never accompanied by partial text.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unsupported placeholder(s) in {block} block: {}", .tokens.join(", "))]
    UnsupportedPlaceholders {
        block: &'static str,
        tokens: Vec<String>,
    },
    #[error("depot list has no depots to render")]
    NoDepots,
    #[error("too many depots: {count} (maximum {max})")]
    TooManyDepots { count: usize, max: usize },
    #[error("rendered text is {len} characters (maximum {max})")]
    OutputTooLong { len: usize, max: usize },
    #[error("output path must be a directory or .7z file: {}", .0.display())]
    InvalidOutputPath(PathBuf),
    #[error("write release notes {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
