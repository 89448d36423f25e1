//! CLI entry point for yt-downloader.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;
mod output;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything requested was done.
    Success,
    /// Some playlist items failed, others succeeded.
    Partial,
    /// Nothing succeeded, or a fatal error occurred.
    Failure,
    /// Stopped by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_app().await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}
