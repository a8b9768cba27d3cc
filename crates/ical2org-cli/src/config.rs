//! Configuration file.
//!
//! Settings live in `~/.config/ical2org/config.toml` by default:
//!
//! ```toml
//! days = 30
//! timezone = "Europe/Paris"
//! include_location = false
//! converter = "pandoc"
//! pandoc = "/usr/local/bin/pandoc"
//! debug = false
//! ```
//!
//! Command-line flags take precedence over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ical2org_core::{ConversionOptions, DEFAULT_WINDOW_DAYS, resolve_timezone};

use crate::cli::{Cli, ConverterKind};
use crate::error::{CliError, CliResult};

/// Configuration for the ical2org command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Ical2OrgConfig {
    /// Window length in days.
    pub days: Option<i64>,

    /// Timezone identifier.
    pub timezone: Option<String>,

    /// Include locations in headlines.
    pub include_location: Option<bool>,

    /// Description converter.
    pub converter: Option<ConverterKind>,

    /// Program run by the pandoc converter.
    pub pandoc: Option<String>,

    /// Debug mode.
    pub debug: bool,
}

impl Ical2OrgConfig {
    /// Loads the file named on the command line, or the default one.
    ///
    /// A missing default file yields the default configuration; an explicit
    /// path must exist. `--print-timezones` needs no configuration, so no
    /// file is read for it.
    pub fn for_cli(cli: &Cli) -> CliResult<Self> {
        if cli.print_timezones {
            return Ok(Self::default());
        }
        match cli.config {
            Some(ref path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Loads configuration from the default path.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ical2org")
    }
}

/// Settings for one run, after merging flags over the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Engine options.
    pub options: ConversionOptions,
    /// Description converter.
    pub converter: ConverterKind,
    /// Program run by the pandoc converter.
    pub pandoc: Option<String>,
}

impl Settings {
    /// Merges command-line flags over the configuration file.
    ///
    /// # Errors
    ///
    /// Returns the timezone error if the configured zone is unknown.
    pub fn resolve(cli: &Cli, config: &Ical2OrgConfig) -> CliResult<Self> {
        let timezone = resolve_timezone(cli.timezone.as_deref().or(config.timezone.as_deref()))?;
        let days = cli
            .days
            .or(config.days)
            .map_or(DEFAULT_WINDOW_DAYS, clamp_days);
        let include_location = cli
            .include_location()
            .or(config.include_location)
            .unwrap_or(true);

        Ok(Self {
            options: ConversionOptions::default()
                .with_window_days(days)
                .with_timezone(timezone)
                .with_location(include_location),
            converter: cli.converter.or(config.converter).unwrap_or_default(),
            pandoc: config.pandoc.clone(),
        })
    }
}

/// Negative windows are clamped to zero.
fn clamp_days(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
