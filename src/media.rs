//! Single-item operations: metadata lookup, format listing, one-off download.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::extract::{ExtractError, ExtractionClient, FetchOptions, FormatInfo, Metadata};
use crate::naming::single_item_template;
use crate::progress::ProgressReporter;

/// Marker the engine uses for an absent codec.
const NO_CODEC: &str = "none";

const UNKNOWN: &str = "unknown";

/// Errors from single-item operations.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The engine failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    Destination {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// What streams a format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// No video stream.
    AudioOnly,
    /// No audio stream.
    VideoOnly,
    /// Both streams.
    VideoAudio,
}

impl FormatKind {
    /// Classifies a format by its codec fields.
    #[must_use]
    pub fn classify(vcodec: Option<&str>, acodec: Option<&str>) -> Self {
        if vcodec == Some(NO_CODEC) {
            Self::AudioOnly
        } else if acodec == Some(NO_CODEC) {
            Self::VideoOnly
        } else {
            Self::VideoAudio
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AudioOnly => "audio only",
            Self::VideoOnly => "video only",
            Self::VideoAudio => "video+audio",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simplified, display-ready view of a [`FormatInfo`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSummary {
    /// Engine format id.
    pub format_id: String,
    /// Container extension, `unknown` when not reported.
    pub ext: String,
    /// Resolution label, `unknown` when not reported.
    pub resolution: String,
    /// Frames per second.
    pub fps: Option<f64>,
    /// Video codec, `none` when absent.
    pub vcodec: String,
    /// Audio codec, `none` when absent.
    pub acodec: String,
    /// Size in bytes.
    pub filesize: Option<u64>,
    /// Stream classification.
    pub kind: FormatKind,
}

impl From<&FormatInfo> for FormatSummary {
    fn from(format: &FormatInfo) -> Self {
        Self {
            format_id: format.format_id.clone(),
            ext: format.ext.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            resolution: format
                .resolution
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            fps: format.fps,
            vcodec: format.vcodec.clone().unwrap_or_else(|| NO_CODEC.to_string()),
            acodec: format.acodec.clone().unwrap_or_else(|| NO_CODEC.to_string()),
            filesize: format.filesize,
            kind: FormatKind::classify(format.vcodec.as_deref(), format.acodec.as_deref()),
        }
    }
}

/// Probes `url` without downloading. Playlists are listed flat.
///
/// # Errors
///
/// Returns the client's [`ExtractError`].
#[instrument(skip(client))]
pub async fn describe(client: &dyn ExtractionClient, url: &str) -> Result<Metadata, ExtractError> {
    client.probe(url, true).await
}

/// Lists the formats available for a single video.
///
/// A playlist URL has no formats of its own and yields an empty list.
///
/// # Errors
///
/// Returns the client's [`ExtractError`].
#[instrument(skip(client))]
pub async fn list_formats(
    client: &dyn ExtractionClient,
    url: &str,
) -> Result<Vec<FormatSummary>, ExtractError> {
    match client.probe(url, false).await? {
        Metadata::Video(video) => {
            debug!(formats = video.formats.len(), "Formats listed");
            Ok(video.formats.iter().map(FormatSummary::from).collect())
        }
        Metadata::Playlist(playlist) => {
            debug!(playlist = %playlist.title, "URL is a playlist, no formats to list");
            Ok(Vec::new())
        }
    }
}

/// Downloads one item as `<title>.<ext>` into `output_root`.
///
/// Audio-only wins over `format_id`. The directory is created if missing.
///
/// # Errors
///
/// - [`MediaError::Destination`] if `output_root` cannot be created
/// - [`MediaError::Extract`] if the download fails
#[instrument(skip(client, progress), fields(output_root = %output_root.display()))]
pub async fn download_video(
    client: &dyn ExtractionClient,
    url: &str,
    output_root: &Path,
    audio_only: bool,
    format_id: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<PathBuf, MediaError> {
    std::fs::create_dir_all(output_root).map_err(|source| MediaError::Destination {
        path: output_root.to_path_buf(),
        source,
    })?;

    let options = FetchOptions::for_mode(audio_only, format_id, single_item_template(output_root));
    let output = client.fetch(url, &options, progress).await?;
    info!(path = %output.output_path.display(), "Download completed");
    Ok(output.output_path)
}
