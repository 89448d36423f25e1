//! Error types for the extraction client boundary.
//!
//! Every failure the external engine can report is folded into one of these
//! variants. The orchestrator only needs to tell [`ExtractError::Unavailable`]
//! apart from everything else, but the remaining kinds keep enough context to
//! produce actionable log lines.

use thiserror::Error;

/// Errors surfaced by an [`ExtractionClient`](super::ExtractionClient).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The provider reports the item as unavailable (removed, private, blocked).
    ///
    /// `source_id` is the provider id recovered from the raw message when it
    /// could be recognised. Recovery is best-effort; callers must cope with
    /// `None`.
    #[error("item unavailable: {message}")]
    Unavailable {
        /// Provider id embedded in the message, if one was recognised.
        source_id: Option<String>,
        /// Raw provider message.
        message: String,
    },

    /// Connectivity problem talking to the provider.
    #[error("network error: {message}")]
    Network {
        /// Raw provider message.
        message: String,
    },

    /// The requested format selector matched nothing.
    #[error("requested format not available: {message}")]
    FormatNotFound {
        /// Raw provider message.
        message: String,
    },

    /// The provider or the filesystem refused access.
    #[error("permission denied: {message}")]
    Permission {
        /// Raw provider message.
        message: String,
    },

    /// The extraction tool could not be started.
    #[error("extraction tool '{program}' could not be started: {source}")]
    ToolNotFound {
        /// Program that was invoked.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The tool produced output that could not be interpreted.
    #[error("could not parse extractor output: {message}")]
    Parse {
        /// What went wrong while parsing.
        message: String,
    },

    /// Any other failure reported by the tool.
    #[error("extraction failed: {message}")]
    Failed {
        /// Raw provider message, or exit status when nothing was printed.
        message: String,
    },
}

impl ExtractError {
    /// Creates an unavailable error.
    pub fn unavailable(source_id: Option<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            source_id,
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a format-not-found error.
    pub fn format_not_found(message: impl Into<String>) -> Self {
        Self::FormatNotFound {
            message: message.into(),
        }
    }

    /// Creates a permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns true for the "item unavailable" failure class.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display_keeps_raw_message() {
        let error = ExtractError::unavailable(
            Some("abc123".to_string()),
            "ERROR: [youtube] abc123: Video unavailable",
        );
        let msg = error.to_string();
        assert!(msg.starts_with("item unavailable"), "got: {msg}");
        assert!(msg.contains("[youtube] abc123"), "got: {msg}");
        assert!(error.is_unavailable());
    }

    #[test]
    fn test_other_kinds_are_not_unavailable() {
        assert!(!ExtractError::network("timed out").is_unavailable());
        assert!(!ExtractError::format_not_found("22").is_unavailable());
        assert!(!ExtractError::permission("HTTP Error 403").is_unavailable());
        assert!(!ExtractError::failed("exit status 1").is_unavailable());
    }

    #[test]
    fn test_tool_not_found_display_names_program() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error = ExtractError::ToolNotFound {
            program: "yt-dlp".to_string(),
            source: io,
        };
        let msg = error.to_string();
        assert!(msg.contains("yt-dlp"), "got: {msg}");
        assert!(msg.contains("no such file"), "got: {msg}");
    }
}
