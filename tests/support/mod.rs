//! Shared fixtures for playlist integration tests.
//!
//! [`ScriptedClient`] stands in for the yt-dlp engine: it serves a fixed
//! playlist listing, fails scripted items, answers title searches, and writes
//! a small file for every successful fetch so the tests can inspect the
//! output directory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use yt_downloader_core::extract::{
    DEFAULT_PROVIDER, ExtractError, ExtractionClient, FetchOptions, FetchOutput, ItemSummary,
    Metadata, PlaylistMetadata, VideoMetadata, watch_url,
};
use yt_downloader_core::naming::{AUDIO_EXTENSION, render_template};
use yt_downloader_core::orchestrator::{DownloadOutcome, ItemError, RunObserver};
use yt_downloader_core::plan::PlannedItem;
use yt_downloader_core::progress::{ProgressEvent, ProgressReporter};

pub const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=PLtest";

/// How a scripted fetch should fail.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Unavailable, with the id embedded in the message.
    Unavailable,
    /// Unavailable, but the message carries no id.
    UnavailableWithoutId,
    /// Unavailable, with another item's id in the message.
    UnavailableNaming(String),
    /// Transient network failure.
    Network,
}

/// A recorded `fetch` call.
#[derive(Debug, Clone)]
pub struct FetchCall {
    pub url: String,
    pub options: FetchOptions,
}

/// In-memory extraction engine.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    listing: Option<PlaylistMetadata>,
    video: Option<VideoMetadata>,
    failures: HashMap<String, Failure>,
    search_hits: HashMap<String, String>,
    titles: HashMap<String, String>,
    break_archive_after: Option<(String, PathBuf)>,
    probes: Mutex<Vec<String>>,
    fetches: Mutex<Vec<FetchCall>>,
}

/// Builds a playlist listing with `count` items named `Track 1..count`.
pub fn playlist(title: &str, count: usize) -> PlaylistMetadata {
    PlaylistMetadata {
        id: "PLtest".to_string(),
        title: title.to_string(),
        uploader: "tester".to_string(),
        items: (1..=count)
            .map(|n| ItemSummary {
                id: item_id(n),
                title: format!("Track {n}"),
                duration: Some(180.0),
                uploader: Some("tester".to_string()),
                url: watch_url(&item_id(n)),
                provider: DEFAULT_PROVIDER.to_string(),
            })
            .collect(),
    }
}

/// Provider id of the `n`-th item produced by [`playlist`].
pub fn item_id(n: usize) -> String {
    format!("vid{n:05}")
}

impl ScriptedClient {
    pub fn with_playlist(listing: PlaylistMetadata) -> Self {
        let titles = listing
            .items
            .iter()
            .map(|item| (item.url.clone(), item.title.clone()))
            .collect();
        Self {
            listing: Some(listing),
            titles,
            ..Self::default()
        }
    }

    pub fn with_video(id: &str, title: &str) -> Self {
        Self {
            video: Some(VideoMetadata {
                id: id.to_string(),
                title: title.to_string(),
                uploader: None,
                duration: None,
                view_count: None,
                upload_date: None,
                thumbnail: None,
                description: None,
                formats: Vec::new(),
            }),
            ..Self::default()
        }
    }

    /// Makes fetches of item `n` fail.
    pub fn failing(mut self, n: usize, failure: Failure) -> Self {
        self.failures.insert(item_id(n), failure);
        self
    }

    /// Makes fetches of an arbitrary source id fail.
    pub fn failing_source(mut self, source_id: &str, failure: Failure) -> Self {
        self.failures.insert(source_id.to_string(), failure);
        self
    }

    /// Replaces `archive` with a directory once item `n` has been written,
    /// so every later archive append fails.
    pub fn breaking_archive_after(mut self, n: usize, archive: PathBuf) -> Self {
        self.break_archive_after = Some((item_id(n), archive));
        self
    }

    /// Makes a title search for `title` return `hit_id`.
    pub fn search_hit(mut self, title: &str, hit_id: &str, hit_title: &str) -> Self {
        self.search_hits
            .insert(title.to_string(), hit_id.to_string());
        self.titles
            .insert(watch_url(hit_id), hit_title.to_string());
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<FetchCall> {
        self.fetches.lock().unwrap().clone()
    }

    fn id_for_url(url: &str) -> Option<&str> {
        url.split_once("v=").map(|(_, id)| id)
    }

    fn search(&self, url: &str) -> Metadata {
        let title = url
            .trim_start_matches("ytsearch:")
            .trim_matches('\'');
        let items = self
            .search_hits
            .get(title)
            .map(|hit| {
                vec![ItemSummary {
                    id: hit.clone(),
                    title: format!("{title} (search hit)"),
                    duration: None,
                    uploader: None,
                    url: watch_url(hit),
                    provider: DEFAULT_PROVIDER.to_string(),
                }]
            })
            .unwrap_or_default();
        Metadata::Playlist(PlaylistMetadata {
            id: String::new(),
            title: title.to_string(),
            uploader: String::new(),
            items,
        })
    }
}

#[async_trait]
impl ExtractionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, url: &str, _flat: bool) -> Result<Metadata, ExtractError> {
        self.probes.lock().unwrap().push(url.to_string());
        if url.starts_with("ytsearch:") {
            return Ok(self.search(url));
        }
        if let Some(listing) = &self.listing {
            return Ok(Metadata::Playlist(listing.clone()));
        }
        if let Some(video) = &self.video {
            return Ok(Metadata::Video(video.clone()));
        }
        Err(ExtractError::network("connection refused"))
    }

    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<FetchOutput, ExtractError> {
        self.fetches.lock().unwrap().push(FetchCall {
            url: url.to_string(),
            options: options.clone(),
        });

        let id = Self::id_for_url(url).unwrap_or(url);
        match self.failures.get(id) {
            Some(Failure::Unavailable) => {
                return Err(ExtractError::unavailable(
                    Some(id.to_string()),
                    format!("ERROR: [youtube] {id}: Video unavailable"),
                ));
            }
            Some(Failure::UnavailableWithoutId) => {
                return Err(ExtractError::unavailable(
                    None,
                    "ERROR: This video is private",
                ));
            }
            Some(Failure::UnavailableNaming(other)) => {
                return Err(ExtractError::unavailable(
                    Some(other.clone()),
                    format!("ERROR: [youtube] {other}: Video unavailable"),
                ));
            }
            Some(Failure::Network) => {
                return Err(ExtractError::network("ERROR: Connection reset by peer"));
            }
            None => {}
        }

        let title = self
            .titles
            .get(url)
            .cloned()
            .unwrap_or_else(|| "Unknown Title".to_string());
        let ext = if options.audio_only_post_process {
            AUDIO_EXTENSION
        } else {
            "mp4"
        };
        let output_path: PathBuf = render_template(&options.output_template, &title, ext);
        std::fs::write(&output_path, title.as_bytes())
            .map_err(|e| ExtractError::failed(format!("writing {}: {e}", output_path.display())))?;
        if let Some((trigger, archive)) = &self.break_archive_after
            && trigger == id
        {
            let _ = std::fs::remove_file(archive);
            std::fs::create_dir_all(archive).unwrap();
        }
        progress.report(&ProgressEvent::finished(
            output_path.to_string_lossy(),
            title.len() as u64,
        ));

        Ok(FetchOutput {
            output_path,
            raw_metadata: None,
        })
    }
}

/// Observer that records every callback.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub started: Mutex<Vec<usize>>,
    pub errors: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<DownloadOutcome>>,
}

impl RunObserver for RecordingObserver {
    fn item_started(&self, planned: &PlannedItem) {
        self.started.lock().unwrap().push(planned.position);
    }

    fn item_error(&self, error: &ItemError) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn item_finished(&self, outcome: &DownloadOutcome) {
        self.finished.lock().unwrap().push(outcome.clone());
    }
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
