//! [`ExtractionClient`] adapter that drives the `yt-dlp` executable.
//!
//! Probes run `yt-dlp --dump-single-json` and parse the payload. Fetches run
//! one child process per item with a machine-readable progress template and a
//! `--print after_move:` line that reports where the file ended up.
//!
//! Failure classification works on the tool's `ERROR:` lines. Recognising an
//! unavailable item and recovering its id from the text is a heuristic tied
//! to the tool's wording; when the wording changes the id silently becomes
//! `None` and callers skip their recovery path.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use super::{
    DEFAULT_PROVIDER, ExtractError, ExtractionClient, FetchOptions, FetchOutput, FormatInfo,
    ItemSummary, Metadata, PlaylistMetadata, VideoMetadata, watch_url,
};
use crate::naming::{AUDIO_EXTENSION, force_audio_extension, render_template};
use crate::progress::{ProgressEvent, ProgressPhase, ProgressReporter};

/// Default executable name.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Audio quality passed to the audio extraction post-processor.
const AUDIO_QUALITY: &str = "192K";

const PROGRESS_PREFIX: &str = "[progress]";

const PROGRESS_TEMPLATE: &str = "download:[progress]%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.filename)s";

const RESULT_TEMPLATE: &str = "after_move:%(.{id,title,ext,filepath})j";

const MUSIC_HOST: &str = "music.youtube.com";

/// Phrases the tool uses when an item cannot be served at all.
const UNAVAILABLE_MARKERS: [&str; 3] = [
    "Video unavailable",
    "This video is not available",
    "Private video",
];

const FORMAT_MARKERS: [&str; 1] = ["Requested format is not available"];

const PERMISSION_MARKERS: [&str; 3] = ["HTTP Error 403", "Permission denied", "Sign in to confirm"];

const NETWORK_MARKERS: [&str; 6] = [
    "Unable to download",
    "timed out",
    "Connection reset",
    "getaddrinfo",
    "Temporary failure in name resolution",
    "Network is unreachable",
];

/// Extracts the provider id from `[youtube] <id>:` in an error message.
#[allow(clippy::expect_used)]
static UNAVAILABLE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[youtube\] ([a-zA-Z0-9_-]+):").expect("unavailable id regex is valid") // Static pattern, safe to panic
});

/// Returns the provider id embedded in an unavailable-item message, if any.
///
/// ```
/// use yt_downloader_core::extract::unavailable_source_id;
///
/// let msg = "ERROR: [youtube] dQw4w9WgXcQ: Video unavailable";
/// assert_eq!(unavailable_source_id(msg).as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(unavailable_source_id("ERROR: something else"), None);
/// ```
#[must_use]
pub fn unavailable_source_id(message: &str) -> Option<String> {
    UNAVAILABLE_ID_PATTERN
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses one line produced by the progress template.
///
/// Returns `None` for lines that are not progress lines or carry a status
/// other than `downloading`/`finished`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.splitn(5, '|');
    let status = fields.next()?.trim();
    let downloaded = parse_byte_count(fields.next()?);
    let total = parse_byte_count(fields.next()?);
    let estimate = parse_byte_count(fields.next()?);
    let filename = fields.next()?.trim().to_string();

    let phase = match status {
        "downloading" => ProgressPhase::Downloading,
        "finished" => ProgressPhase::Finished,
        _ => return None,
    };

    Some(ProgressEvent {
        phase,
        filename,
        bytes_done: downloaded.unwrap_or(0),
        bytes_total: total.or(estimate),
    })
}

fn parse_byte_count(raw: &str) -> Option<u64> {
    let value = raw.trim().parse::<f64>().ok()?;
    bytes_from_f64(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bytes_from_f64(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

/// Maps the tool's error text to a failure kind.
pub(crate) fn classify_failure(message: &str) -> ExtractError {
    if UNAVAILABLE_MARKERS.iter().any(|m| message.contains(m)) {
        let source_id = unavailable_source_id(message);
        if source_id.is_none() {
            debug!(message, "unavailable item without a recognizable source id");
        }
        return ExtractError::unavailable(source_id, message);
    }
    if FORMAT_MARKERS.iter().any(|m| message.contains(m)) {
        return ExtractError::format_not_found(message);
    }
    if PERMISSION_MARKERS.iter().any(|m| message.contains(m)) {
        return ExtractError::permission(message);
    }
    if NETWORK_MARKERS.iter().any(|m| message.contains(m)) {
        return ExtractError::network(message);
    }
    ExtractError::failed(message)
}

/// Minimal view of `yt-dlp --dump-single-json`. Everything is optional
/// because flat listings and older items omit most fields.
#[derive(Debug, Deserialize)]
struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    upload_date: Option<String>,
    thumbnail: Option<String>,
    description: Option<String>,
    formats: Option<Vec<RawFormat>>,
    entries: Option<Vec<Option<RawEntry>>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    ie_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

/// The JSON line printed after the file is moved into place.
#[derive(Debug, Deserialize)]
struct MovedFile {
    title: Option<String>,
    ext: Option<String>,
    filepath: Option<String>,
}

/// Parses a `--dump-single-json` payload into [`Metadata`].
pub(crate) fn metadata_from_json(raw: &str) -> Result<Metadata, ExtractError> {
    let mut info: RawInfo = serde_json::from_str(raw)
        .map_err(|e| ExtractError::parse(format!("invalid metadata JSON: {e}")))?;

    let Some(entries) = info.entries.take() else {
        return Ok(Metadata::Video(video_from_raw(info)));
    };

    let items: Vec<ItemSummary> = entries
        .into_iter()
        .flatten()
        .filter_map(item_from_entry)
        .collect();

    Ok(Metadata::Playlist(PlaylistMetadata {
        id: info.id.unwrap_or_else(|| "Unknown ID".to_string()),
        title: info.title.unwrap_or_else(|| "Unknown Playlist".to_string()),
        uploader: info
            .uploader
            .or(info.channel)
            .unwrap_or_else(|| "Unknown Uploader".to_string()),
        items,
    }))
}

fn item_from_entry(entry: RawEntry) -> Option<ItemSummary> {
    let Some(id) = entry.id.filter(|id| !id.is_empty()) else {
        trace!("dropping playlist entry without id");
        return None;
    };
    let url = entry
        .url
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .or(entry.webpage_url)
        .unwrap_or_else(|| watch_url(&id));
    let provider = entry
        .ie_key
        .map(|key| key.to_lowercase())
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

    Some(ItemSummary {
        title: entry.title.unwrap_or_else(|| "Unknown Title".to_string()),
        duration: entry.duration,
        uploader: entry.uploader.or(entry.channel),
        url,
        provider,
        id,
    })
}

fn video_from_raw(info: RawInfo) -> VideoMetadata {
    VideoMetadata {
        id: info.id.unwrap_or_else(|| "Unknown ID".to_string()),
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        uploader: info.uploader.or(info.channel),
        duration: info.duration,
        view_count: info.view_count,
        upload_date: info.upload_date,
        thumbnail: info.thumbnail,
        description: info.description,
        formats: info
            .formats
            .unwrap_or_default()
            .into_iter()
            .map(|f| FormatInfo {
                format_id: f.format_id.unwrap_or_else(|| "unknown".to_string()),
                ext: f.ext,
                resolution: f.resolution,
                fps: f.fps,
                vcodec: f.vcodec,
                acodec: f.acodec,
                filesize: f.filesize.or(f.filesize_approx).and_then(bytes_from_f64),
            })
            .collect(),
    }
}

fn needs_music_compat(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(MUSIC_HOST)))
        .unwrap_or(false)
}

/// Arguments for a metadata-only probe.
pub(crate) fn probe_args(url: &str, flat: bool) -> Vec<String> {
    let mut args: Vec<String> = [
        "--dump-single-json",
        "--skip-download",
        "--no-warnings",
        "--quiet",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    if flat {
        args.push("--flat-playlist".to_string());
    }
    if needs_music_compat(url) {
        args.push("--compat-options".to_string());
        args.push("no-youtube-unavailable-videos".to_string());
    }
    args.push(url.to_string());
    args
}

/// Arguments for downloading a single item.
pub(crate) fn fetch_args(url: &str, options: &FetchOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--newline".to_string(),
        "--progress".to_string(),
        "--no-simulate".to_string(),
        "--progress-template".to_string(),
        PROGRESS_TEMPLATE.to_string(),
        "--print".to_string(),
        RESULT_TEMPLATE.to_string(),
        "--format".to_string(),
        options.format_selector.clone(),
        "--output".to_string(),
        options.output_template.clone(),
    ];
    if options.audio_only_post_process {
        args.extend(
            [
                "--extract-audio",
                "--audio-format",
                AUDIO_EXTENSION,
                "--audio-quality",
                AUDIO_QUALITY,
            ]
            .iter()
            .map(ToString::to_string),
        );
    }
    args.push(url.to_string());
    args
}

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    program: String,
}

impl YtDlpClient {
    /// Creates a client that runs `yt-dlp` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Creates a client that runs the given executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the configured executable.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs `<program> --version` and returns the reported version.
    ///
    /// # Errors
    ///
    /// [`ExtractError::ToolNotFound`] when the program cannot be started,
    /// [`ExtractError::Failed`] when it exits unsuccessfully.
    pub async fn ensure_available(&self) -> Result<String, ExtractError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| self.tool_not_found(source))?;

        if !output.status.success() {
            return Err(ExtractError::failed(format!(
                "{} --version exited with {}",
                self.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn tool_not_found(&self, source: std::io::Error) -> ExtractError {
        ExtractError::ToolNotFound {
            program: self.program.clone(),
            source,
        }
    }
}

impl Default for YtDlpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionClient for YtDlpClient {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, url: &str, flat: bool) -> Result<Metadata, ExtractError> {
        let output = Command::new(&self.program)
            .args(probe_args(url, flat))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| self.tool_not_found(source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = error_message(stderr.lines(), &output.status.to_string());
            return Err(classify_failure(&message));
        }

        let raw = String::from_utf8(output.stdout)
            .map_err(|e| ExtractError::parse(format!("metadata is not UTF-8: {e}")))?;
        metadata_from_json(&raw)
    }

    #[instrument(level = "debug", skip(self, options, progress), fields(template = %options.output_template))]
    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<FetchOutput, ExtractError> {
        let mut child = Command::new(&self.program)
            .args(fetch_args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.tool_not_found(source))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::failed("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractError::failed("child stderr was not captured"))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut moved: Option<(MovedFile, serde_json::Value)> = None;
        let mut diagnostics: Vec<String> = Vec::new();

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_progress_line(&line) {
                            forward_progress(progress, &event);
                        } else if let Some(parsed) = parse_moved_line(&line) {
                            moved = Some(parsed);
                        } else {
                            trace!(line = %line, "yt-dlp stdout");
                        }
                    }
                    Ok(None) | Err(_) => stdout_open = false,
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_progress_line(&line) {
                            forward_progress(progress, &event);
                        } else {
                            trace!(line = %line, "yt-dlp stderr");
                            diagnostics.push(line);
                        }
                    }
                    Ok(None) | Err(_) => stderr_open = false,
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExtractError::failed(format!("waiting for {}: {e}", self.program)))?;

        if !status.success() {
            let message = error_message(diagnostics.iter().map(String::as_str), &status.to_string());
            return Err(classify_failure(&message));
        }

        let Some((file, raw)) = moved else {
            warn!(url, "yt-dlp exited successfully without reporting an output file");
            return Err(ExtractError::parse("engine did not report an output file"));
        };

        let output_path = match file.filepath {
            Some(path) => PathBuf::from(path),
            None => {
                let title = file.title.as_deref().unwrap_or("Unknown Title");
                let ext = file.ext.as_deref().unwrap_or(AUDIO_EXTENSION);
                render_template(&options.output_template, title, ext)
            }
        };
        let output_path = if options.audio_only_post_process {
            force_audio_extension(&output_path)
        } else {
            output_path
        };

        progress.report(&ProgressEvent::finished(
            output_path.to_string_lossy(),
            std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0),
        ));

        Ok(FetchOutput {
            output_path,
            raw_metadata: Some(raw),
        })
    }
}

// The tool reports `finished` per downloaded stream, before post-processing.
// Only the single `Finished` sent once the final path is known is forwarded.
fn forward_progress(progress: &dyn ProgressReporter, event: &ProgressEvent) {
    if event.phase == ProgressPhase::Downloading {
        progress.report(event);
    } else {
        trace!(file = %event.filename, "stream finished");
    }
}

fn parse_moved_line(line: &str) -> Option<(MovedFile, serde_json::Value)> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let file: MovedFile = serde_json::from_value(value.clone()).ok()?;
    Some((file, value))
}

/// Joins the tool's `ERROR:` lines, falling back to the last diagnostic line
/// and finally to the exit status.
fn error_message<'a>(lines: impl Iterator<Item = &'a str>, status: &str) -> String {
    let lines: Vec<&str> = lines.map(str::trim).filter(|l| !l.is_empty()).collect();
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }
    lines
        .last()
        .map_or_else(|| format!("yt-dlp exited with {status}"), |l| (*l).to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_source_id_extracts_id() {
        let msg = "ERROR: [youtube] a-B_9xYz012: Video unavailable. This video has been removed";
        assert_eq!(unavailable_source_id(msg).as_deref(), Some("a-B_9xYz012"));
    }

    #[test]
    fn test_unavailable_source_id_none_for_other_extractors() {
        assert_eq!(
            unavailable_source_id("ERROR: [soundcloud] 123: Video unavailable"),
            None
        );
    }

    #[test]
    fn test_classify_failure_unavailable_carries_id() {
        let error = classify_failure("ERROR: [youtube] abc: Video unavailable");
        match error {
            ExtractError::Unavailable { source_id, message } => {
                assert_eq!(source_id.as_deref(), Some("abc"));
                assert!(message.contains("Video unavailable"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_failure_unavailable_without_id() {
        let error = classify_failure("ERROR: Video unavailable");
        assert!(matches!(
            error,
            ExtractError::Unavailable {
                source_id: None,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_failure_other_kinds() {
        assert!(matches!(
            classify_failure("ERROR: [youtube] x: Requested format is not available"),
            ExtractError::FormatNotFound { .. }
        ));
        assert!(matches!(
            classify_failure("ERROR: unable to download video data: HTTP Error 403: Forbidden"),
            ExtractError::Permission { .. }
        ));
        assert!(matches!(
            classify_failure("ERROR: [youtube] x: Unable to download webpage: timed out"),
            ExtractError::Network { .. }
        ));
        assert!(matches!(
            classify_failure("ERROR: Postprocessing: ffmpeg not found"),
            ExtractError::Failed { .. }
        ));
    }

    #[test]
    fn test_parse_progress_line_downloading_with_estimate() {
        let event =
            parse_progress_line("[progress]downloading|1024|NA|4096.5|/out/001 - Song.webm").unwrap();
        assert_eq!(event.phase, ProgressPhase::Downloading);
        assert_eq!(event.bytes_done, 1024);
        assert_eq!(event.bytes_total, Some(4096));
        assert_eq!(event.filename, "/out/001 - Song.webm");
    }

    #[test]
    fn test_parse_progress_line_unknown_total() {
        let event = parse_progress_line("[progress]downloading|10|NA|NA|a.webm").unwrap();
        assert_eq!(event.bytes_total, None);
    }

    #[test]
    fn test_parse_progress_line_finished() {
        let event = parse_progress_line("[progress]finished|2048|2048|NA|a|b.webm").unwrap();
        assert_eq!(event.phase, ProgressPhase::Finished);
        assert_eq!(event.filename, "a|b.webm");
    }

    #[test]
    fn test_parse_progress_line_rejects_other_lines() {
        assert!(parse_progress_line("[download] Destination: x.webm").is_none());
        assert!(parse_progress_line("[progress]error|0|NA|NA|x").is_none());
    }

    #[test]
    fn test_metadata_from_json_playlist_drops_missing_entries() {
        let raw = r#"{
            "id": "PL123",
            "title": "Road Trip",
            "uploader": "dj",
            "entries": [
                {"id": "a1", "title": "First", "url": "https://www.youtube.com/watch?v=a1", "ie_key": "Youtube", "duration": 61.0},
                null,
                {"title": "no id"},
                {"id": "b2", "title": "Second", "url": "b2"}
            ]
        }"#;
        let Metadata::Playlist(playlist) = metadata_from_json(raw).unwrap() else {
            panic!("expected playlist");
        };
        assert_eq!(playlist.title, "Road Trip");
        assert_eq!(playlist.items.len(), 2);
        assert_eq!(playlist.items[0].provider, "youtube");
        assert_eq!(playlist.items[0].duration, Some(61.0));
        assert_eq!(playlist.items[1].url, "https://www.youtube.com/watch?v=b2");
    }

    #[test]
    fn test_metadata_from_json_playlist_defaults() {
        let Metadata::Playlist(playlist) = metadata_from_json(r#"{"entries": []}"#).unwrap() else {
            panic!("expected playlist");
        };
        assert_eq!(playlist.title, "Unknown Playlist");
        assert_eq!(playlist.uploader, "Unknown Uploader");
        assert!(playlist.items.is_empty());
    }

    #[test]
    fn test_metadata_from_json_video_with_formats() {
        let raw = r#"{
            "id": "v1", "title": "Clip", "channel": "chan", "view_count": 10,
            "formats": [
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a", "filesize": 1000},
                {"format_id": "137", "ext": "mp4", "resolution": "1920x1080", "vcodec": "avc1", "acodec": "none", "filesize_approx": 2500.7}
            ]
        }"#;
        let Metadata::Video(video) = metadata_from_json(raw).unwrap() else {
            panic!("expected video");
        };
        assert_eq!(video.uploader.as_deref(), Some("chan"));
        assert_eq!(video.formats.len(), 2);
        assert_eq!(video.formats[0].filesize, Some(1000));
        assert_eq!(video.formats[1].filesize, Some(2500));
    }

    #[test]
    fn test_metadata_from_json_invalid() {
        assert!(matches!(
            metadata_from_json("not json"),
            Err(ExtractError::Parse { .. })
        ));
    }

    #[test]
    fn test_probe_args_flat_and_music_compat() {
        let args = probe_args("https://music.youtube.com/playlist?list=PL1", true);
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(args.contains(&"no-youtube-unavailable-videos".to_string()));
        assert_eq!(args.last().unwrap(), "https://music.youtube.com/playlist?list=PL1");

        let args = probe_args("https://www.youtube.com/watch?v=x", false);
        assert!(!args.contains(&"--flat-playlist".to_string()));
        assert!(!args.contains(&"--compat-options".to_string()));
    }

    #[test]
    fn test_fetch_args_audio_mode_extracts_mp3() {
        let options = FetchOptions::for_mode(true, None, "/out/001 - %(title)s.%(ext)s".to_string());
        let args = fetch_args("https://www.youtube.com/watch?v=x", &options);
        let joined = args.join(" ");
        assert!(joined.contains("--format bestaudio/best"), "got: {joined}");
        assert!(joined.contains("--extract-audio --audio-format mp3 --audio-quality 192K"));
        assert!(joined.contains("--output /out/001 - %(title)s.%(ext)s"));
        assert!(args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_fetch_args_video_mode_has_no_audio_extraction() {
        let options = FetchOptions::for_mode(false, Some("22"), "t".to_string());
        let args = fetch_args("u", &options);
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--format" && w[1] == "22"));
    }

    #[test]
    fn test_parse_moved_line() {
        let (file, raw) =
            parse_moved_line(r#"{"id": "x", "title": "Song", "ext": "mp3", "filepath": "/out/Song.mp3"}"#)
                .unwrap();
        assert_eq!(file.filepath.as_deref(), Some("/out/Song.mp3"));
        assert_eq!(raw["id"], "x");
        assert!(parse_moved_line("[download] 100%").is_none());
    }

    #[test]
    fn test_error_message_prefers_error_lines() {
        let lines = ["WARNING: slow", "ERROR: [youtube] x: Video unavailable", ""];
        assert_eq!(
            error_message(lines.into_iter(), "exit status: 1"),
            "ERROR: [youtube] x: Video unavailable"
        );
        assert_eq!(
            error_message(["something odd"].into_iter(), "exit status: 1"),
            "something odd"
        );
        assert_eq!(
            error_message(std::iter::empty(), "exit status: 2"),
            "yt-dlp exited with exit status: 2"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_reports_a_single_finished_event_with_final_path() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;

        const TOOL: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
path=$(printf '%s' "$out" | sed -e "s/%(title)s/Song/" -e "s/%(ext)s/webm/")
printf 'media' > "$path"
echo "[progress]downloading|2|5|NA|$path.part"
echo "[progress]finished|5|5|NA|$path.part"
echo "[progress]finished|5|5|NA|$path"
printf '{"id":"x","title":"Song","ext":"webm","filepath":"%s"}\n' "$path"
"#;

        #[derive(Default)]
        struct Recorder(Mutex<Vec<ProgressEvent>>);

        impl ProgressReporter for Recorder {
            fn report(&self, event: &ProgressEvent) {
                self.0.lock().unwrap().push(event.clone());
            }
        }

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("fake-yt-dlp");
        std::fs::write(&tool, TOOL).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let client = YtDlpClient::with_program(tool.to_string_lossy());
        let options = FetchOptions::for_mode(
            false,
            None,
            crate::naming::single_item_template(dir.path()),
        );
        let recorder = Recorder::default();
        let output = client
            .fetch("https://www.youtube.com/watch?v=x", &options, &recorder)
            .await
            .unwrap();

        assert_eq!(output.output_path, dir.path().join("Song.webm"));
        let events = recorder.0.lock().unwrap();
        let phases: Vec<ProgressPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![ProgressPhase::Downloading, ProgressPhase::Finished]);
        assert_eq!(
            events[1].filename,
            dir.path().join("Song.webm").to_string_lossy()
        );
        assert_eq!(events[1].bytes_done, 5);
    }

    #[tokio::test]
    async fn test_ensure_available_reports_missing_program() {
        let client = YtDlpClient::with_program("definitely-not-a-real-yt-dlp-binary");
        let result = client.ensure_available().await;
        assert!(matches!(result, Err(ExtractError::ToolNotFound { .. })));
    }
}
