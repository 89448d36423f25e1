//! Terminal progress: per-file byte bars and per-item status lines.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use yt_downloader_core::{
    DownloadOutcome, ProgressEvent, ProgressPhase, ProgressReporter, RunObserver,
};

use crate::output;

const BAR_TEMPLATE: &str =
    "{msg:40!} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}";

/// Renders one byte-progress bar per transferred file.
///
/// The bar belongs to this reporter; a new file name replaces it.
pub(crate) struct BarReporter {
    enabled: bool,
    current: Mutex<Option<(String, ProgressBar)>>,
}

impl BarReporter {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: Mutex::new(None),
        }
    }
}

fn new_bar(event: &ProgressEvent) -> ProgressBar {
    let bar = ProgressBar::new(event.bytes_total.unwrap_or(0));
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(event.display_name().to_string());
    bar
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: &ProgressEvent) {
        if !self.enabled {
            return;
        }
        let Ok(mut current) = self.current.lock() else {
            return;
        };

        match event.phase {
            ProgressPhase::Downloading => {
                if current
                    .as_ref()
                    .is_some_and(|(name, _)| name != &event.filename)
                    && let Some((_, bar)) = current.take()
                {
                    bar.finish_and_clear();
                }
                let (_, bar) = current
                    .get_or_insert_with(|| (event.filename.clone(), new_bar(event)));
                if let Some(total) = event.bytes_total {
                    bar.set_length(total);
                }
                bar.set_position(event.bytes_done);
            }
            ProgressPhase::Finished => {
                if let Some((_, bar)) = current.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

/// Prints one status line per finished playlist item.
pub(crate) struct ConsoleObserver {
    quiet: bool,
}

impl ConsoleObserver {
    pub(crate) fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl RunObserver for ConsoleObserver {
    fn item_finished(&self, outcome: &DownloadOutcome) {
        if self.quiet {
            return;
        }
        println!("{}", output::outcome_line(outcome, output::terminal_width()));
    }
}
