//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Directory name under the user config root.
const APP_CONFIG_DIR: &str = "yt-downloader";

/// TOML-style file configuration for CLI defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default output directory.
    pub output_dir: Option<PathBuf>,
    /// Download audio only by default.
    pub audio_only: Option<bool>,
    /// Skip archived items by default.
    pub skip_existing: Option<bool>,
    /// Search for substitutes of unavailable playlist items.
    pub fallback: Option<bool>,
    /// Default format code.
    pub format: Option<String>,
    /// Path to the yt-dlp executable.
    pub yt_dlp: Option<String>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(format) = &self.format
            && format.trim().is_empty()
        {
            bail!("Invalid config value for `format`: must not be empty");
        }
        if let Some(yt_dlp) = &self.yt_dlp
            && yt_dlp.trim().is_empty()
        {
            bail!("Invalid config value for `yt_dlp`: must not be empty");
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/yt-downloader/config.toml`
/// 2. `$HOME/.config/yt-downloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(APP_CONFIG_DIR)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_CONFIG_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "audio_only" => cfg.audio_only = Some(parse_boolean(value).with_context(invalid)?),
            "skip_existing" => {
                cfg.skip_existing = Some(parse_boolean(value).with_context(invalid)?);
            }
            "fallback" => cfg.fallback = Some(parse_boolean(value).with_context(invalid)?),
            "format" => cfg.format = Some(parse_string_literal(value).with_context(invalid)?),
            "yt_dlp" => cfg.yt_dlp = Some(parse_string_literal(value).with_context(invalid)?),
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/media/music"
audio_only = true
skip_existing = false
fallback = false
format = "140"
yt_dlp = "/opt/yt-dlp"
verbosity = "verbose"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/media/music")));
        assert_eq!(cfg.audio_only, Some(true));
        assert_eq!(cfg.skip_existing, Some(false));
        assert_eq!(cfg.fallback, Some(false));
        assert_eq!(cfg.format.as_deref(), Some("140"));
        assert_eq!(cfg.yt_dlp.as_deref(), Some("/opt/yt-dlp"));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str("audio_only = true").expect("partial config should parse");
        assert_eq!(cfg.audio_only, Some(true));
        assert!(cfg.output_dir.is_none());
        assert!(cfg.verbosity.is_none());
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r##"
# defaults for the music box
output_dir = "/srv/#mixes" # hash inside quotes is kept
verbosity = "quiet" # preferred noise level
"##,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/srv/#mixes")));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("\nconcurrency = 4").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("concurrency"));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("fallback = yes").expect_err("invalid boolean expected");
        assert!(err.to_string().contains("fallback"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("output_dir = /tmp").expect_err("quoted string expected");
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("audio_only true").expect_err("syntax error expected");
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_verbosity() {
        let err = parse_config_str(r#"verbosity = "loud""#).expect_err("bad verbosity expected");
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_parse_config_rejects_empty_format() {
        let err = parse_config_str(r#"format = """#).expect_err("empty format expected");
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_verbosity_as_str() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Verbose.as_str(), "verbose");
        assert_eq!(VerbositySetting::Quiet.as_str(), "quiet");
        assert_eq!(VerbositySetting::Debug.as_str(), "debug");
    }
}
