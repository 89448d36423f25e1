//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default directory for downloads.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Default extraction tool executable.
pub const DEFAULT_YT_DLP: &str = "yt-dlp";

const EXAMPLES: &str = "\
Examples:
  # Download a single video in best quality
  yt-downloader -u https://www.youtube.com/watch?v=dQw4w9WgXcQ

  # Download audio only
  yt-downloader -u https://www.youtube.com/watch?v=dQw4w9WgXcQ --audio-only

  # List available formats, then download a specific one
  yt-downloader -u https://www.youtube.com/watch?v=dQw4w9WgXcQ --list-formats
  yt-downloader -u https://www.youtube.com/watch?v=dQw4w9WgXcQ -f 22

  # Download a playlist as audio only
  yt-downloader -u https://www.youtube.com/playlist?list=PLExample --playlist --audio-only

  # Download one item, or a range of items, from a playlist
  yt-downloader -u https://www.youtube.com/playlist?list=PLExample --playlist --item 237
  yt-downloader -u https://www.youtube.com/playlist?list=PLExample --playlist --start 50 --end 60

  # Show information about a video or playlist
  yt-downloader -u https://www.youtube.com/playlist?list=PLExample --info";

/// Download videos and playlists through yt-dlp.
///
/// Playlist items are numbered without gaps, unavailable items are replaced
/// by a title search when possible, and finished items are remembered in
/// `<output-dir>/archive.txt` so reruns skip them.
#[derive(Parser, Debug, Clone)]
#[command(name = "yt-downloader")]
#[command(author, version, about, after_help = EXAMPLES)]
pub struct Args {
    /// URL of the video or playlist
    #[arg(short, long)]
    pub url: String,

    /// Directory to save downloaded files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// List available formats for the video
    #[arg(long, help_heading = "Actions", conflicts_with_all = ["info", "playlist"])]
    pub list_formats: bool,

    /// Show information about the video or playlist
    #[arg(long, help_heading = "Actions", conflicts_with = "playlist")]
    pub info: bool,

    /// Download as playlist
    #[arg(long, help_heading = "Actions")]
    pub playlist: bool,

    /// Format code to download (see --list-formats)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Download audio only (converted to mp3)
    #[arg(long)]
    pub audio_only: bool,

    /// Skip items already recorded in the archive (default)
    #[arg(long, overrides_with = "no_skip_existing")]
    pub skip_existing: bool,

    /// Download items even if they are recorded in the archive
    #[arg(long, overrides_with = "skip_existing")]
    pub no_skip_existing: bool,

    /// Do not search for substitutes of unavailable playlist items
    #[arg(long)]
    pub no_fallback: bool,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PATH", default_value = DEFAULT_YT_DLP)]
    pub yt_dlp: String,

    /// Download only this playlist item (1-based)
    #[arg(long, help_heading = "Playlist Options")]
    pub item: Option<usize>,

    /// Start at this playlist item (1-based, inclusive)
    #[arg(long, help_heading = "Playlist Options")]
    pub start: Option<usize>,

    /// Stop at this playlist item (1-based, inclusive)
    #[arg(long, help_heading = "Playlist Options")]
    pub end: Option<usize>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Effective archive skipping after flag overrides.
    #[must_use]
    pub fn skip_existing_enabled(&self) -> bool {
        !self.no_skip_existing
    }

    /// Returns true if any playlist selection option was given.
    #[must_use]
    pub fn has_playlist_selection(&self) -> bool {
        self.item.is_some() || self.start.is_some() || self.end.is_some()
    }
}
