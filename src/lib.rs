//! yt-downloader core library
//!
//! Downloads remote media playlists item by item through an external
//! extraction engine, keeping output densely numbered, substituting
//! unavailable items via title search, and remembering finished items in an
//! append-only archive so reruns skip them.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - Extraction engine boundary and the `yt-dlp` adapter
//! - [`plan`] - Item selection (all, single index, range)
//! - [`orchestrator`] - Sequential playlist download state machine
//! - [`fallback`] - Substitute lookup for unavailable items
//! - [`archive`] - Append-only skip-list of downloaded items
//! - [`media`] - Single-item operations (info, formats, one-off download)
//! - [`naming`] - Output directory and file name templates
//! - [`progress`] - Transfer progress event contract

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod extract;
pub mod fallback;
pub mod media;
pub mod naming;
pub mod orchestrator;
pub mod plan;
pub mod progress;

// Re-export commonly used types
pub use archive::{ArchiveEntry, ArchiveError, ArchiveStore};
pub use extract::{
    ExtractError, ExtractionClient, FetchOptions, FetchOutput, FormatInfo, ItemSummary, Metadata,
    PlaylistMetadata, VideoMetadata, YtDlpClient,
};
pub use fallback::{FallbackResolver, SearchFallback};
pub use media::{FormatKind, FormatSummary, MediaError, describe, download_video, list_formats};
pub use orchestrator::{
    DownloadOutcome, ItemError, NoopObserver, OutcomeStatus, PlaylistDownloader, PlaylistRequest,
    RunError, RunObserver, RunReport,
};
pub use plan::{PlannedItem, SelectionPolicy, ValidationError, plan};
pub use progress::{NoProgress, ProgressEvent, ProgressPhase, ProgressReporter};
