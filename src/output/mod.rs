//! CLI output formatting and display helpers.
//!
//! Renderers return lines so they can be tested; the `print_*` wrappers write
//! them to stdout.

use std::path::Path;

use yt_downloader_core::{
    DownloadOutcome, FormatSummary, Metadata, OutcomeStatus, PlaylistMetadata, RunReport,
    VideoMetadata,
};

/// Items listed before the playlist listing is cut short.
const INFO_LISTED_ITEMS: usize = 10;

/// Playlists longer than this are cut short in the info listing.
const INFO_TRUNCATE_ABOVE: usize = 15;

/// Files listed in the run summary.
const SUMMARY_LISTED_FILES: usize = 5;

const DESCRIPTION_WIDTH: usize = 80;

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "Unknown".to_string(), |v| v.to_string())
}

pub(crate) fn format_table_lines(url: &str, formats: &[FormatSummary]) -> Vec<String> {
    let mut lines = vec![
        format!("Available formats for {url}:"),
        format!(
            "{:<10} {:<8} {:<12} {:<6} {:<12} {:<25}",
            "Format ID", "Ext", "Resolution", "FPS", "Size", "Type"
        ),
        "-".repeat(80),
    ];
    for format in formats {
        let fps = format.fps.map_or_else(|| "N/A".to_string(), |fps| format!("{fps}"));
        let size = format
            .filesize
            .map_or_else(|| "unknown".to_string(), |bytes| indicatif::HumanBytes(bytes).to_string());
        lines.push(format!(
            "{:<10} {:<8} {:<12} {:<6} {:<12} {:<25}",
            format.format_id, format.ext, format.resolution, fps, size, format.kind
        ));
    }
    if formats.is_empty() {
        lines.push("No formats reported (is this a playlist URL?)".to_string());
    }
    lines
}

pub(crate) fn print_formats(url: &str, formats: &[FormatSummary]) {
    for line in format_table_lines(url, formats) {
        println!("{line}");
    }
}

pub(crate) fn info_lines(metadata: &Metadata) -> Vec<String> {
    match metadata {
        Metadata::Video(video) => video_info_lines(video),
        Metadata::Playlist(playlist) => playlist_info_lines(playlist),
    }
}

fn video_info_lines(video: &VideoMetadata) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "===== VIDEO INFORMATION =====".to_string(),
        format!("Title: {}", video.title),
        format!("ID: {}", video.id),
        format!("Uploader: {}", or_unknown(video.uploader.as_deref())),
        format!(
            "Duration: {}",
            video
                .duration
                .map_or_else(|| "Unknown".to_string(), |secs| format!("{secs} seconds"))
        ),
        format!("View Count: {}", or_unknown(video.view_count)),
        format!("Upload Date: {}", or_unknown(video.upload_date.as_deref())),
        String::new(),
        "Description:".to_string(),
    ];
    match video.description.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(description) => lines.extend(wrap_indented(description, DESCRIPTION_WIDTH)),
        None => lines.push("  No description available".to_string()),
    }
    lines
}

fn playlist_info_lines(playlist: &PlaylistMetadata) -> Vec<String> {
    let count = playlist.items.len();
    let mut lines = vec![
        String::new(),
        "===== PLAYLIST INFORMATION =====".to_string(),
        format!("Title: {}", playlist.title),
        format!("ID: {}", playlist.id),
        format!("Uploader: {}", playlist.uploader),
        format!("Video Count: {count}"),
        String::new(),
        "Videos in playlist:".to_string(),
    ];

    let shown = if count > INFO_TRUNCATE_ABOVE {
        INFO_LISTED_ITEMS
    } else {
        count
    };
    for (index, item) in playlist.items.iter().take(shown).enumerate() {
        lines.push(format!("{}. {} (ID: {})", index + 1, item.title, item.id));
    }
    if shown < count {
        lines.push(format!("... and {} more videos", count - shown));
    }
    lines
}

/// Greedy word wrap with a two-space indent.
fn wrap_indented(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::from(" ");
        for word in paragraph.split_whitespace() {
            if line.len() > 2 && line.len() + 1 + word.len() > width {
                lines.push(std::mem::replace(&mut line, String::from(" ")));
            }
            line.push(' ');
            line.push_str(word);
        }
        if line.len() > 2 {
            lines.push(line);
        }
    }
    lines
}

pub(crate) fn print_info(metadata: &Metadata) {
    for line in info_lines(metadata) {
        println!("{line}");
    }
}

pub(crate) fn outcome_line(outcome: &DownloadOutcome, width: usize) -> String {
    let line = match outcome.status {
        OutcomeStatus::Succeeded | OutcomeStatus::Substituted => {
            let file = outcome
                .output_path
                .as_deref()
                .map_or_else(|| outcome.title.clone(), file_name);
            let suffix = if outcome.status == OutcomeStatus::Substituted {
                " (substitute)"
            } else {
                ""
            };
            format!("✓ [{}] Downloaded: {file}{suffix}", outcome.position)
        }
        OutcomeStatus::SkippedArchived => {
            format!("- [{}] Already archived: {}", outcome.position, outcome.title)
        }
        OutcomeStatus::FailedPermanently => format!(
            "✗ [{}] Failed: {} ({})",
            outcome.position,
            outcome.title,
            outcome.failure_reason.as_deref().unwrap_or("unknown error")
        ),
    };
    truncate_to_width(&line, width)
}

pub(crate) fn run_summary_lines(report: &RunReport) -> Vec<String> {
    let paths = report.output_paths();
    let mut lines = vec![
        String::new(),
        format!(
            "Successfully downloaded {} files from the playlist",
            paths.len()
        ),
    ];
    for path in paths.iter().take(SUMMARY_LISTED_FILES) {
        lines.push(format!("- {}", file_name(path)));
    }
    if paths.len() > SUMMARY_LISTED_FILES {
        lines.push(format!(
            "... and {} more files",
            paths.len() - SUMMARY_LISTED_FILES
        ));
    }
    lines.push(format!(
        "Succeeded: {}, substituted: {}, skipped: {}, failed: {}",
        report.succeeded(),
        report.substituted(),
        report.skipped(),
        report.failed()
    ));
    lines.push(format!("Saved to: {}", report.destination.display()));
    if report.was_interrupted() {
        lines.push("Interrupted. Run again to resume; archived items will be skipped.".to_string());
    }
    lines
}

pub(crate) fn print_run_summary(report: &RunReport) {
    for line in run_summary_lines(report) {
        println!("{line}");
    }
}

pub(crate) fn print_single_download(path: &Path) {
    println!();
    println!("Download complete: {}", file_name(path));
    println!("Saved to: {}", path.display());
}
