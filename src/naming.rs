//! Output naming: destination directories and engine output templates.
//!
//! Playlist items are written as `<NNN> - <title>.<ext>` inside a directory
//! named after the playlist; single downloads are `<title>.<ext>` in the
//! output root. Templates use the engine's `%(field)s` syntax so the engine
//! fills in the final title and container extension.

use std::path::{Component, Path, PathBuf};

/// Container extension produced by audio-only post-processing.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Name of the archive log inside the output root.
pub const ARCHIVE_FILE_NAME: &str = "archive.txt";

const TITLE_FIELD: &str = "%(title)s";
const EXT_FIELD: &str = "%(ext)s";

/// Formats a numbering slot as a 3-digit zero-padded index.
#[must_use]
pub fn slot_label(slot: usize) -> String {
    format!("{slot:03}")
}

/// Template for the `slot`-th successful item of a playlist run.
#[must_use]
pub fn playlist_item_template(dir: &Path, slot: usize) -> String {
    format!(
        "{}/{} - {TITLE_FIELD}.{EXT_FIELD}",
        escape_template_literal(&dir.to_string_lossy()),
        slot_label(slot)
    )
}

/// Template for a single (non-playlist) download.
#[must_use]
pub fn single_item_template(dir: &Path) -> String {
    format!(
        "{}/{TITLE_FIELD}.{EXT_FIELD}",
        escape_template_literal(&dir.to_string_lossy())
    )
}

/// Expands a template the way the engine would for the given title and extension.
///
/// Used when the engine does not echo back the final path.
#[must_use]
pub fn render_template(template: &str, title: &str, ext: &str) -> PathBuf {
    let title = sanitize_filename(title);
    let rendered = template
        .replace(TITLE_FIELD, &title)
        .replace(EXT_FIELD, ext)
        .replace("%%", "%");
    PathBuf::from(rendered)
}

/// Replaces the extension with the audio container extension.
#[must_use]
pub fn force_audio_extension(path: &Path) -> PathBuf {
    path.with_extension(AUDIO_EXTENSION)
}

/// Directory for a playlist's files inside `output_root`.
#[must_use]
pub fn playlist_dir(output_root: &Path, playlist_title: &str) -> PathBuf {
    output_root.join(sanitize_filename(playlist_title))
}

/// Sanitizes a title for use as a single path segment.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

// The engine treats `%` as the start of a field reference.
fn escape_template_literal(value: &str) -> String {
    value.replace('%', "%%")
}
