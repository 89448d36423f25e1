//! Boundary to the external extraction/download engine.
//!
//! The engine itself (site scraping, decoding, muxing) lives outside this
//! crate. Everything here describes what the rest of the crate needs from it:
//!
//! - [`ExtractionClient`] - async trait with `probe` (metadata only) and
//!   `fetch` (download to a templated path)
//! - [`Metadata`] - result of a probe, either a playlist or a single video
//! - [`FetchOptions`] / [`FetchOutput`] - download request and result
//! - [`ExtractError`] - failure kinds, with "unavailable" kept distinct
//! - [`YtDlpClient`] - adapter driving the `yt-dlp` executable

mod error;
mod ytdlp;

pub use error::ExtractError;
pub use ytdlp::{YtDlpClient, parse_progress_line, unavailable_source_id};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::progress::ProgressReporter;

/// Format selector used for audio-only downloads.
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio/best";

/// Format selector used when neither audio-only nor an explicit format is requested.
pub const DEFAULT_VIDEO_FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best";

/// Provider name recorded for items whose extractor is not reported.
pub const DEFAULT_PROVIDER: &str = "youtube";

/// Canonical watch URL for a video id on the default provider.
#[must_use]
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Snapshot of a playlist, fetched flat (ids and titles only).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMetadata {
    /// Provider playlist id.
    pub id: String,
    /// Playlist title.
    pub title: String,
    /// Playlist owner.
    pub uploader: String,
    /// Entries in playlist order. Missing entries were dropped while parsing.
    pub items: Vec<ItemSummary>,
}

impl PlaylistMetadata {
    /// Finds an item by its provider id.
    #[must_use]
    pub fn find_item(&self, source_id: &str) -> Option<&ItemSummary> {
        self.items.iter().find(|item| item.id == source_id)
    }
}

/// One playlist entry as listed by a flat probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    /// Provider-unique id.
    pub id: String,
    /// Title at listing time.
    pub title: String,
    /// Duration in seconds, when listed.
    pub duration: Option<f64>,
    /// Uploader, when listed.
    pub uploader: Option<String>,
    /// The item's own source URL.
    pub url: String,
    /// Lowercase provider (extractor) name, used for archive entries.
    pub provider: String,
}

/// Full metadata of a single video.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoMetadata {
    /// Provider-unique id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Uploader.
    pub uploader: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// View count.
    pub view_count: Option<u64>,
    /// Upload date as `YYYYMMDD`.
    pub upload_date: Option<String>,
    /// Thumbnail URL.
    pub thumbnail: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Available formats.
    pub formats: Vec<FormatInfo>,
}

/// Result of [`ExtractionClient::probe`].
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    /// The URL resolved to a playlist.
    Playlist(PlaylistMetadata),
    /// The URL resolved to a single video.
    Video(VideoMetadata),
}

/// One downloadable format as reported by the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatInfo {
    /// Engine format id (what `--format` accepts).
    pub format_id: String,
    /// Container extension.
    pub ext: Option<String>,
    /// Resolution label, e.g. `1920x1080` or `audio only`.
    pub resolution: Option<String>,
    /// Frames per second.
    pub fps: Option<f64>,
    /// Video codec, `none` for audio-only formats.
    pub vcodec: Option<String>,
    /// Audio codec, `none` for video-only formats.
    pub acodec: Option<String>,
    /// Size in bytes (exact or approximate).
    pub filesize: Option<u64>,
}

/// Options for a single [`ExtractionClient::fetch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Engine format selector.
    pub format_selector: String,
    /// Extract audio to [`AUDIO_EXTENSION`](crate::naming::AUDIO_EXTENSION) after download.
    pub audio_only_post_process: bool,
    /// Output path template (see [`crate::naming`]).
    pub output_template: String,
}

impl FetchOptions {
    /// Builds options for the requested mode.
    ///
    /// Audio-only wins over an explicit format id; with neither, the default
    /// mp4+m4a selector is used.
    #[must_use]
    pub fn for_mode(audio_only: bool, format_id: Option<&str>, output_template: String) -> Self {
        let format_selector = if audio_only {
            AUDIO_FORMAT_SELECTOR.to_string()
        } else if let Some(format_id) = format_id {
            format_id.to_string()
        } else {
            DEFAULT_VIDEO_FORMAT_SELECTOR.to_string()
        };
        Self {
            format_selector,
            audio_only_post_process: audio_only,
            output_template,
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutput {
    /// Final path of the written file.
    pub output_path: PathBuf,
    /// Raw engine metadata for the item, when the engine returned any.
    pub raw_metadata: Option<serde_json::Value>,
}

/// The external extraction/download engine.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the orchestrator can hold an
/// `Arc<dyn ExtractionClient>` and tests can substitute a scripted client.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Returns the client's name (for logging).
    fn name(&self) -> &str;

    /// Extracts metadata without downloading.
    ///
    /// With `flat`, playlist entries are listed without probing each one.
    async fn probe(&self, url: &str, flat: bool) -> Result<Metadata, ExtractError>;

    /// Downloads one item to the path described by `options.output_template`.
    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<FetchOutput, ExtractError>;
}
