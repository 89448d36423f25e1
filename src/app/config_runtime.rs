use anyhow::Result;
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};

use crate::app_config::{FileConfig, VerbositySetting, load_default_file_config};
use crate::cli::Args;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) audio_only: bool,
    pub(crate) skip_existing: bool,
    pub(crate) no_skip_existing: bool,
    pub(crate) no_fallback: bool,
    pub(crate) format: bool,
    pub(crate) yt_dlp: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let command = Args::command();
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let sources = CliValueSources {
        output_dir: is_commandline_value(&matches, "output_dir"),
        audio_only: is_commandline_value(&matches, "audio_only"),
        skip_existing: is_commandline_value(&matches, "skip_existing"),
        no_skip_existing: is_commandline_value(&matches, "no_skip_existing"),
        no_fallback: is_commandline_value(&matches, "no_fallback"),
        format: is_commandline_value(&matches, "format"),
        yt_dlp: is_commandline_value(&matches, "yt_dlp"),
        verbose: is_commandline_value(&matches, "verbose"),
        quiet: is_commandline_value(&matches, "quiet"),
    };
    (args, sources)
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Loads the config file and fills in every option not given on the command line.
pub(crate) fn resolve_args(args: Args, cli_sources: &CliValueSources) -> Result<Args> {
    let loaded = load_default_file_config()?;
    Ok(apply_config_defaults(args, cli_sources, loaded.config.as_ref()))
}

pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.output_dir
        && let Some(output_dir) = &file_config.output_dir
    {
        args.output_dir = output_dir.clone();
    }

    if !cli_sources.audio_only
        && let Some(audio_only) = file_config.audio_only
    {
        args.audio_only = audio_only;
    }

    if !cli_sources.skip_existing
        && !cli_sources.no_skip_existing
        && let Some(skip_existing) = file_config.skip_existing
    {
        args.skip_existing = skip_existing;
        args.no_skip_existing = !skip_existing;
    }

    if !cli_sources.no_fallback
        && let Some(fallback) = file_config.fallback
    {
        args.no_fallback = !fallback;
    }

    if !cli_sources.format
        && args.format.is_none()
        && let Some(format) = &file_config.format
    {
        args.format = Some(format.clone());
    }

    if !cli_sources.yt_dlp
        && let Some(yt_dlp) = &file_config.yt_dlp
    {
        args.yt_dlp = yt_dlp.clone();
    }

    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(verbosity) = file_config.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    args
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.verbose = 0;
        }
        VerbositySetting::Verbose => {
            args.quiet = false;
            args.verbose = 1;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.verbose = 0;
        }
        VerbositySetting::Debug => {
            args.quiet = false;
            args.verbose = 2;
        }
    }
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["yt-downloader", "-u", "https://example.com/v"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_apply_config_defaults_without_file_keeps_args() {
        let merged = apply_config_defaults(args(&[]), &CliValueSources::default(), None);
        assert_eq!(merged.output_dir, PathBuf::from("./downloads"));
        assert!(merged.skip_existing_enabled());
        assert!(!merged.no_fallback);
    }

    #[test]
    fn test_apply_config_defaults_fills_unset_values() {
        let config = FileConfig {
            output_dir: Some(PathBuf::from("/music")),
            audio_only: Some(true),
            skip_existing: Some(false),
            fallback: Some(false),
            format: Some("140".to_string()),
            yt_dlp: Some("/opt/yt-dlp".to_string()),
            verbosity: Some(VerbositySetting::Quiet),
        };
        let merged = apply_config_defaults(args(&[]), &CliValueSources::default(), Some(&config));
        assert_eq!(merged.output_dir, PathBuf::from("/music"));
        assert!(merged.audio_only);
        assert!(!merged.skip_existing_enabled());
        assert!(merged.no_fallback);
        assert_eq!(merged.format.as_deref(), Some("140"));
        assert_eq!(merged.yt_dlp, "/opt/yt-dlp");
        assert!(merged.quiet);
        assert_eq!(resolve_default_log_level(&merged), "error");
    }

    #[test]
    fn test_cli_values_win_over_config() {
        let config = FileConfig {
            output_dir: Some(PathBuf::from("/music")),
            skip_existing: Some(false),
            verbosity: Some(VerbositySetting::Quiet),
            ..FileConfig::default()
        };
        let sources = CliValueSources {
            output_dir: true,
            skip_existing: true,
            verbose: true,
            ..CliValueSources::default()
        };
        let merged = apply_config_defaults(
            args(&["-o", "/tmp/here", "--skip-existing", "-v"]),
            &sources,
            Some(&config),
        );
        assert_eq!(merged.output_dir, PathBuf::from("/tmp/here"));
        assert!(merged.skip_existing_enabled());
        assert!(!merged.quiet);
        assert_eq!(resolve_default_log_level(&merged), "debug");
        assert!(should_force_cli_log_level(&sources));
    }

    #[test]
    fn test_resolve_default_log_level() {
        assert_eq!(resolve_default_log_level(&args(&[])), "info");
        assert_eq!(resolve_default_log_level(&args(&["-v"])), "debug");
        assert_eq!(resolve_default_log_level(&args(&["-vv"])), "trace");
        assert_eq!(resolve_default_log_level(&args(&["-q"])), "error");
    }
}
