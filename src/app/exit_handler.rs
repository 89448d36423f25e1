//! Exit code logic for the yt-downloader process.
//!
//! Single responsibility: map a run's results to the process exit outcome.

use yt_downloader_core::RunReport;

use crate::ProcessExit;

/// Determines the process exit outcome from succeeded and failed item counts.
pub(crate) fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Exit outcome for a playlist run; an interrupt overrides the counts.
pub(crate) fn exit_outcome_for_report(report: &RunReport) -> ProcessExit {
    if report.was_interrupted() {
        ProcessExit::Interrupted
    } else {
        determine_exit_outcome(report.successes(), report.failed())
    }
}
