//! Playlist download orchestration.
//!
//! [`PlaylistDownloader::run`] resolves a playlist once, plans the items to
//! process, and downloads them strictly one after another. Each item ends in
//! exactly one [`OutcomeStatus`]. Per-item failures are recorded and the run
//! moves on; only playlist resolution, validation and destination setup
//! abort a run.
//!
//! # Numbering
//!
//! Files are named `<NNN> - <title>.<ext>`, where `NNN` counts confirmed
//! successes in this run (starting at 001). Failed and archive-skipped items
//! do not consume a number, so the output is always densely numbered.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yt_downloader_core::extract::YtDlpClient;
//! use yt_downloader_core::orchestrator::{PlaylistDownloader, PlaylistRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(YtDlpClient::new());
//! let downloader = PlaylistDownloader::new(client, "./downloads");
//! let report = downloader
//!     .run(&PlaylistRequest::new("https://www.youtube.com/playlist?list=PL123"))
//!     .await?;
//! println!("{} downloaded, {} failed", report.successes(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::archive::{ArchiveError, ArchiveStore};
use crate::extract::{
    ExtractError, ExtractionClient, FetchOptions, FetchOutput, Metadata, PlaylistMetadata,
};
use crate::fallback::FallbackResolver;
use crate::naming::{ARCHIVE_FILE_NAME, playlist_dir, playlist_item_template};
use crate::plan::{PlannedItem, SelectionPolicy, ValidationError, plan};
use crate::progress::{NoProgress, ProgressReporter};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The playlist could not be probed.
    #[error("failed to resolve playlist {url}: {source}")]
    PlaylistResolution {
        /// Requested URL.
        url: String,
        /// Probe failure.
        #[source]
        source: ExtractError,
    },

    /// The URL resolved to something other than a playlist.
    #[error("{url} is not a playlist")]
    NotAPlaylist {
        /// Requested URL.
        url: String,
    },

    /// The item selection is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The destination directory could not be created.
    #[error("failed to create destination directory {path}: {source}")]
    Destination {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The existing archive could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Per-item errors. Reported to the [`RunObserver`]; never abort a run.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The provider reports the item as unavailable.
    #[error("item {position} unavailable: {message}")]
    Unavailable {
        /// Playlist position.
        position: usize,
        /// Provider id recovered from the message.
        source_id: Option<String>,
        /// Provider message.
        message: String,
    },

    /// The download failed for any other reason.
    #[error("item {position} failed: {source}")]
    Download {
        /// Playlist position.
        position: usize,
        /// Extraction failure.
        #[source]
        source: ExtractError,
    },

    /// No substitute could be found or downloaded.
    #[error("fallback for item {position} ('{title}') failed: {reason}")]
    Fallback {
        /// Playlist position.
        position: usize,
        /// Title that was searched.
        title: String,
        /// What went wrong.
        reason: String,
    },

    /// The download succeeded but could not be recorded in the archive.
    #[error("item {position} downloaded but not archived: {source}")]
    ArchiveWrite {
        /// Playlist position.
        position: usize,
        /// Archive failure.
        #[source]
        source: ArchiveError,
    },
}

impl ItemError {
    /// Playlist position the error refers to.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Unavailable { position, .. }
            | Self::Download { position, .. }
            | Self::Fallback { position, .. }
            | Self::ArchiveWrite { position, .. } => *position,
        }
    }
}

/// Terminal state of one planned item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Downloaded from its own source.
    Succeeded,
    /// Unavailable; a substitute found by title search was downloaded instead.
    Substituted,
    /// Already recorded in the archive.
    SkippedArchived,
    /// Could not be downloaded.
    FailedPermanently,
}

impl OutcomeStatus {
    /// Returns true for `Succeeded` and `Substituted`.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded | Self::Substituted)
    }

    /// Lowercase label for logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Substituted => "substituted",
            Self::SkippedArchived => "skipped",
            Self::FailedPermanently => "failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one planned item.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    /// Playlist position.
    pub position: usize,
    /// Provider id of the playlist item.
    pub source_id: String,
    /// Title at listing time.
    pub title: String,
    /// Written file, for successes.
    pub output_path: Option<PathBuf>,
    /// Terminal state.
    pub status: OutcomeStatus,
    /// Human-readable reason, for failures.
    pub failure_reason: Option<String>,
}

impl DownloadOutcome {
    fn new(planned: &PlannedItem, status: OutcomeStatus) -> Self {
        Self {
            position: planned.position,
            source_id: planned.item.id.clone(),
            title: planned.item.title.clone(),
            output_path: None,
            status,
            failure_reason: None,
        }
    }

    fn downloaded(planned: &PlannedItem, status: OutcomeStatus, path: PathBuf) -> Self {
        Self {
            output_path: Some(path),
            ..Self::new(planned, status)
        }
    }

    fn failed(planned: &PlannedItem, reason: impl Into<String>) -> Self {
        Self {
            failure_reason: Some(reason.into()),
            ..Self::new(planned, OutcomeStatus::FailedPermanently)
        }
    }
}

/// Summary of a finished (or interrupted) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Playlist title.
    pub playlist_title: String,
    /// Directory the files were written to.
    pub destination: PathBuf,
    /// Number of items the selection matched.
    pub planned: usize,
    /// Outcomes in attempt order.
    pub outcomes: Vec<DownloadOutcome>,
    /// The run stopped early on an interrupt.
    pub interrupted: bool,
}

impl RunReport {
    /// Paths of successfully written files, in attempt order.
    #[must_use]
    pub fn output_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_success())
            .filter_map(|outcome| outcome.output_path.as_deref())
            .collect()
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Items downloaded from their own source.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Succeeded)
    }

    /// Items replaced by a substitute.
    #[must_use]
    pub fn substituted(&self) -> usize {
        self.count(OutcomeStatus::Substituted)
    }

    /// Successes of either kind.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.succeeded() + self.substituted()
    }

    /// Items skipped because they were already archived.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::SkippedArchived)
    }

    /// Items that could not be downloaded.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::FailedPermanently)
    }

    /// Returns true if the run stopped early on an interrupt.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Parameters of one playlist run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRequest {
    /// Playlist URL.
    pub url: String,
    /// Items to process.
    pub selection: SelectionPolicy,
    /// Download audio and convert to mp3.
    pub audio_only: bool,
    /// Explicit engine format id, ignored when `audio_only` is set.
    pub format_id: Option<String>,
    /// Skip items already recorded in the archive.
    pub skip_existing: bool,
}

impl PlaylistRequest {
    /// Creates a request for every item, video mode, archive skipping on.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selection: SelectionPolicy::All,
            audio_only: false,
            format_id: None,
            skip_existing: true,
        }
    }
}

/// Synchronous callbacks for per-item events. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    /// An item is about to be attempted.
    fn item_started(&self, _planned: &PlannedItem) {}

    /// A per-item error occurred. An item may report several.
    fn item_error(&self, _error: &ItemError) {}

    /// An item reached its terminal state.
    fn item_finished(&self, _outcome: &DownloadOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Sequential playlist downloader.
pub struct PlaylistDownloader {
    client: Arc<dyn ExtractionClient>,
    fallback: Option<Arc<dyn FallbackResolver>>,
    output_root: PathBuf,
    progress: Arc<dyn ProgressReporter>,
    observer: Arc<dyn RunObserver>,
    interrupt: Arc<AtomicBool>,
}

impl fmt::Debug for PlaylistDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistDownloader")
            .field("client", &self.client.name())
            .field("fallback", &self.fallback.is_some())
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}

// Mutable state of one run.
struct RunState {
    destination: PathBuf,
    archive: ArchiveStore,
    next_slot: usize,
}

impl PlaylistDownloader {
    /// Creates a downloader writing below `output_root`, without fallback.
    #[must_use]
    pub fn new(client: Arc<dyn ExtractionClient>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            fallback: None,
            output_root: output_root.into(),
            progress: Arc::new(NoProgress),
            observer: Arc::new(NoopObserver),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables substitution of unavailable items.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Sets the progress reporter handed to every fetch.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the per-item observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Uses `flag` as the interrupt signal; checked before each item.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Root directory for playlist folders and the archive.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Path of the archive file.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.output_root.join(ARCHIVE_FILE_NAME)
    }

    /// Downloads the selected items of a playlist.
    ///
    /// # Errors
    ///
    /// - [`RunError::Validation`] if the selection is invalid (checked before any probe)
    /// - [`RunError::PlaylistResolution`] / [`RunError::NotAPlaylist`] if the URL does not resolve to a playlist
    /// - [`RunError::Destination`] if the playlist directory cannot be created
    /// - [`RunError::Archive`] if an existing archive cannot be read
    ///
    /// Individual item failures do NOT cause this method to error; they are
    /// recorded in the returned report.
    #[instrument(skip(self, request), fields(url = %request.url, audio_only = request.audio_only))]
    pub async fn run(&self, request: &PlaylistRequest) -> Result<RunReport, RunError> {
        request.selection.validate()?;

        let metadata = match self.client.probe(&request.url, true).await {
            Ok(Metadata::Playlist(playlist)) => playlist,
            Ok(Metadata::Video(_)) => {
                return Err(RunError::NotAPlaylist {
                    url: request.url.clone(),
                });
            }
            Err(source) => {
                return Err(RunError::PlaylistResolution {
                    url: request.url.clone(),
                    source,
                });
            }
        };

        let planned = plan(&metadata, request.selection);
        info!(
            playlist = %metadata.title,
            listed = metadata.items.len(),
            planned = planned.len(),
            "Playlist resolved"
        );

        let destination = playlist_dir(&self.output_root, &metadata.title);
        std::fs::create_dir_all(&destination).map_err(|source| RunError::Destination {
            path: destination.clone(),
            source,
        })?;
        let archive = ArchiveStore::load(&self.archive_path())?;

        let mut state = RunState {
            destination,
            archive,
            next_slot: 1,
        };
        let mut outcomes = Vec::with_capacity(planned.len());
        let mut interrupted = false;

        for item in &planned {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!(position = item.position, "Interrupted, stopping before next item");
                interrupted = true;
                break;
            }

            let outcome = if request.skip_existing
                && state.archive.contains(&item.item.provider, &item.item.id)
            {
                debug!(position = item.position, id = %item.item.id, "Already archived, skipping");
                DownloadOutcome::new(item, OutcomeStatus::SkippedArchived)
            } else {
                self.observer.item_started(item);
                self.process_item(item, &metadata, request, &mut state).await
            };

            self.observer.item_finished(&outcome);
            outcomes.push(outcome);
        }

        let report = RunReport {
            playlist_title: metadata.title.clone(),
            destination: state.destination,
            planned: planned.len(),
            outcomes,
            interrupted,
        };
        info!(
            succeeded = report.succeeded(),
            substituted = report.substituted(),
            skipped = report.skipped(),
            failed = report.failed(),
            interrupted,
            "Playlist run finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        planned: &PlannedItem,
        metadata: &PlaylistMetadata,
        request: &PlaylistRequest,
        state: &mut RunState,
    ) -> DownloadOutcome {
        let template = playlist_item_template(&state.destination, state.next_slot);
        let options =
            FetchOptions::for_mode(request.audio_only, request.format_id.as_deref(), template);

        info!(
            position = planned.position,
            slot = state.next_slot,
            title = %planned.item.title,
            "Downloading item"
        );

        match self
            .client
            .fetch(&planned.item.url, &options, self.progress.as_ref())
            .await
        {
            Ok(output) => {
                self.record_success(planned, &planned.item.provider, &planned.item.id, state);
                info!(position = planned.position, path = %output.output_path.display(), "Item downloaded");
                DownloadOutcome::downloaded(planned, OutcomeStatus::Succeeded, output.output_path)
            }
            Err(ExtractError::Unavailable { source_id, message }) => {
                let error = ItemError::Unavailable {
                    position: planned.position,
                    source_id: source_id.clone(),
                    message: message.clone(),
                };
                warn!(position = planned.position, error = %error, "Item unavailable");
                self.observer.item_error(&error);
                self.substitute(planned, metadata, source_id.as_deref(), state)
                    .await
                    .unwrap_or_else(|| DownloadOutcome::failed(planned, message))
            }
            Err(source) => {
                let reason = source.to_string();
                let error = ItemError::Download {
                    position: planned.position,
                    source,
                };
                warn!(position = planned.position, error = %error, "Item failed");
                self.observer.item_error(&error);
                DownloadOutcome::failed(planned, reason)
            }
        }
    }

    /// Fallback path for an unavailable item. `None` means no substitute.
    async fn substitute(
        &self,
        planned: &PlannedItem,
        metadata: &PlaylistMetadata,
        source_id: Option<&str>,
        state: &mut RunState,
    ) -> Option<DownloadOutcome> {
        let fallback = self.fallback.as_ref()?;

        let Some(source_id) = source_id else {
            warn!(position = planned.position, "No item id in unavailable message, fallback skipped");
            return None;
        };
        let listed = match metadata.find_item(source_id) {
            Some(listed) if listed.id == planned.item.id => listed,
            Some(_) => {
                warn!(
                    position = planned.position,
                    reported = source_id,
                    planned = %planned.item.id,
                    "Unavailable message names another playlist item, using the planned item"
                );
                &planned.item
            }
            None => {
                warn!(
                    position = planned.position,
                    id = source_id,
                    "Unavailable item not found in playlist, fallback skipped"
                );
                return None;
            }
        };

        info!(position = planned.position, title = %listed.title, "Searching for substitute");
        let Some(url) = fallback.resolve(&listed.title).await else {
            self.report_fallback_failure(planned, &listed.title, "no search results");
            return Some(DownloadOutcome::failed(planned, "unavailable; no substitute found"));
        };

        let template = playlist_item_template(&state.destination, state.next_slot);
        let options = FetchOptions::for_mode(true, None, template);
        match self.client.fetch(&url, &options, self.progress.as_ref()).await {
            Ok(FetchOutput { output_path, .. }) => {
                self.record_success(planned, &listed.provider, &listed.id, state);
                info!(
                    position = planned.position,
                    substitute = %url,
                    path = %output_path.display(),
                    "Substitute downloaded"
                );
                Some(DownloadOutcome::downloaded(
                    planned,
                    OutcomeStatus::Substituted,
                    output_path,
                ))
            }
            Err(error) => {
                let reason = error.to_string();
                self.report_fallback_failure(planned, &listed.title, &reason);
                Some(DownloadOutcome::failed(
                    planned,
                    format!("unavailable; substitute failed: {reason}"),
                ))
            }
        }
    }

    fn report_fallback_failure(&self, planned: &PlannedItem, title: &str, reason: &str) {
        let error = ItemError::Fallback {
            position: planned.position,
            title: title.to_string(),
            reason: reason.to_string(),
        };
        warn!(error = %error, "Fallback failed");
        self.observer.item_error(&error);
    }

    /// Consumes the current slot and appends the archive entry.
    fn record_success(
        &self,
        planned: &PlannedItem,
        provider: &str,
        source_id: &str,
        state: &mut RunState,
    ) {
        state.next_slot += 1;
        if let Err(source) = state.archive.append(provider, source_id) {
            let error = ItemError::ArchiveWrite {
                position: planned.position,
                source,
            };
            warn!(error = %error, "Archive entry not written");
            self.observer.item_error(&error);
        }
    }
}
