//! Progress event contract between the extraction client and its observers.
//!
//! Events are purely observational: a reporter cannot slow down or cancel a
//! transfer. Each fetch ends with exactly one `Finished` event, carrying the
//! final output path; `Downloading` events may name intermediate files. Reporters are per-run values handed to each fetch call, so no
//! progress state is shared process-wide.

/// Transfer phase of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Bytes are still arriving.
    Downloading,
    /// The file transfer completed (post-processing may still follow).
    Finished,
}

/// One progress notification for a file being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Current phase.
    pub phase: ProgressPhase,
    /// File being written, as reported by the engine.
    pub filename: String,
    /// Bytes transferred so far.
    pub bytes_done: u64,
    /// Expected total, exact or estimated. `None` when unknown.
    pub bytes_total: Option<u64>,
}

impl ProgressEvent {
    /// Creates a `Downloading` event.
    #[must_use]
    pub fn downloading(filename: impl Into<String>, bytes_done: u64, bytes_total: Option<u64>) -> Self {
        Self {
            phase: ProgressPhase::Downloading,
            filename: filename.into(),
            bytes_done,
            bytes_total,
        }
    }

    /// Creates a `Finished` event.
    #[must_use]
    pub fn finished(filename: impl Into<String>, bytes_done: u64) -> Self {
        Self {
            phase: ProgressPhase::Finished,
            filename: filename.into(),
            bytes_done,
            bytes_total: Some(bytes_done),
        }
    }

    /// Returns the file name without its directory.
    #[must_use]
    pub fn display_name(&self) -> &str {
        std::path::Path::new(&self.filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Receives progress events during a single item's transfer.
pub trait ProgressReporter: Send + Sync {
    /// Called synchronously for each event, in arrival order.
    fn report(&self, event: &ProgressEvent);
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_directories() {
        let event = ProgressEvent::downloading("/tmp/My Mix/001 - Song.webm", 10, None);
        assert_eq!(event.display_name(), "001 - Song.webm");
    }

    #[test]
    fn test_finished_event_reports_total_equal_to_done() {
        let event = ProgressEvent::finished("song.mp3", 4096);
        assert_eq!(event.phase, ProgressPhase::Finished);
        assert_eq!(event.bytes_total, Some(4096));
    }
}
