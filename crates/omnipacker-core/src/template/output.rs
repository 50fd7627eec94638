use std::path::{Path, PathBuf};

use super::block::TemplateBlock;
use super::error::TemplateError;
use super::metadata::TemplateMetadata;
use super::render::TemplateRenderer;

/// `<dir>.txt` beside an output directory, or the `.7z` archive with a `.txt` extension.
pub fn release_notes_path(output_path: &Path) -> Result<PathBuf, TemplateError> {
    if output_path.is_dir() {
        let name = output_path
            .file_name()
            .ok_or_else(|| TemplateError::InvalidOutputPath(output_path.to_path_buf()))?;
        let mut file = name.to_os_string();
        file.push(".txt");
        return Ok(output_path.with_file_name(file));
    }
    if output_path.extension().and_then(|e| e.to_str()) == Some("7z") {
        return Ok(output_path.with_extension("txt"));
    }
    Err(TemplateError::InvalidOutputPath(output_path.to_path_buf()))
}

/// Renders `blocks` and writes the text next to the finished output.
/// Nothing is written when rendering fails.
pub fn write_release_notes(
    renderer: &TemplateRenderer,
    output_path: &Path,
    metadata: &TemplateMetadata,
    blocks: &[TemplateBlock],
) -> Result<PathBuf, TemplateError> {
    let path = release_notes_path(output_path)?;
    let text = renderer.render(blocks, metadata)?;
    std::fs::write(&path, text).map_err(|source| TemplateError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "release notes written");
    Ok(path)
}
