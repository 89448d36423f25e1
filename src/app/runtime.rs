use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use yt_downloader_core::{
    ExtractionClient, PlaylistDownloader, PlaylistRequest, SearchFallback, SelectionPolicy,
    YtDlpClient, describe, download_video, list_formats,
};

use crate::app::progress::{BarReporter, ConsoleObserver};
use crate::app::{config_runtime, exit_handler, terminal};
use crate::cli::Args;
use crate::{ProcessExit, output};

pub(crate) async fn run_app() -> Result<ProcessExit> {
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();
    let args = config_runtime::resolve_args(args, &cli_sources)?;

    let default_level = config_runtime::resolve_default_log_level(&args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?args, "CLI arguments parsed");

    // Selection problems are reported before the tool is even looked up.
    let selection = validate_selection(&args)?;

    let client = Arc::new(YtDlpClient::with_program(args.yt_dlp.clone()));
    let version = client.ensure_available().await.with_context(|| {
        format!(
            "yt-dlp is required but '{}' could not be run. Install yt-dlp or pass --yt-dlp PATH",
            args.yt_dlp
        )
    })?;
    info!(version = %version, program = %args.yt_dlp, "Extraction tool ready");

    if args.list_formats {
        let formats = list_formats(client.as_ref(), &args.url)
            .await
            .with_context(|| format!("Failed to list formats for {}", args.url))?;
        output::print_formats(&args.url, &formats);
        return Ok(ProcessExit::Success);
    }

    if args.info {
        let metadata = describe(client.as_ref(), &args.url)
            .await
            .with_context(|| format!("Failed to get information for {}", args.url))?;
        output::print_info(&metadata);
        return Ok(ProcessExit::Success);
    }

    let use_progress_bars = terminal::should_use_progress_bars(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let progress = Arc::new(BarReporter::new(use_progress_bars));

    if args.playlist {
        run_playlist(&args, selection, client, progress).await
    } else {
        run_single(&args, client.as_ref(), progress.as_ref()).await
    }
}

pub(crate) fn validate_selection(args: &Args) -> Result<SelectionPolicy> {
    let selection = SelectionPolicy::from_flags(args.item, args.start, args.end)?;
    if args.has_playlist_selection() && !args.playlist {
        bail!("Playlist options (--item, --start, --end) require the --playlist flag");
    }
    Ok(selection)
}

fn mode_label(audio_only: bool) -> &'static str {
    if audio_only {
        "Audio only mode"
    } else {
        "Video mode"
    }
}

async fn run_playlist(
    args: &Args,
    selection: SelectionPolicy,
    client: Arc<YtDlpClient>,
    progress: Arc<BarReporter>,
) -> Result<ProcessExit> {
    if !args.quiet {
        println!("Downloading playlist: {}", args.url);
        println!("{}", mode_label(args.audio_only));
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let client: Arc<dyn ExtractionClient> = client;
    let mut downloader = PlaylistDownloader::new(Arc::clone(&client), args.output_dir.clone())
        .with_progress(progress)
        .with_observer(Arc::new(ConsoleObserver::new(args.quiet)))
        .with_interrupt(Arc::clone(&interrupted));
    if args.no_fallback {
        debug!("Fallback search disabled");
    } else {
        downloader = downloader.with_fallback(Arc::new(SearchFallback::new(client)));
    }

    let request = PlaylistRequest {
        url: args.url.clone(),
        selection,
        audio_only: args.audio_only,
        format_id: args.format.clone(),
        skip_existing: args.skip_existing_enabled(),
    };
    let report = downloader
        .run(&request)
        .await
        .with_context(|| format!("Playlist download failed for {}", args.url))?;

    if !args.quiet {
        output::print_run_summary(&report);
    }
    if report.was_interrupted() || interrupted.load(Ordering::SeqCst) {
        warn!(
            succeeded = report.successes(),
            planned = report.planned,
            "Interrupted. Run again to resume."
        );
        return Ok(ProcessExit::Interrupted);
    }

    Ok(exit_handler::exit_outcome_for_report(&report))
}

async fn run_single(
    args: &Args,
    client: &dyn ExtractionClient,
    progress: &BarReporter,
) -> Result<ProcessExit> {
    if !args.quiet {
        println!("Downloading: {}", args.url);
        println!("{}", mode_label(args.audio_only));
        if let Some(format) = args.format.as_deref().filter(|_| !args.audio_only) {
            println!("Using format: {format}");
        }
    }

    let output_root: &Path = &args.output_dir;
    let download = download_video(
        client,
        &args.url,
        output_root,
        args.audio_only,
        args.format.as_deref(),
        progress,
    );

    // Dropping the download future kills the child process.
    tokio::select! {
        result = download => {
            let path = result.with_context(|| format!("Download failed for {}", args.url))?;
            if !args.quiet {
                output::print_single_download(&path);
            }
            Ok(ProcessExit::Success)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Download cancelled by user");
            Ok(ProcessExit::Interrupted)
        }
    }
}
