//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur while running the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A positional argument is missing.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// Conversion failure.
    #[error(transparent)]
    Conversion(#[from] ical2org_core::Error),
}

impl CliError {
    /// Returns the unknown timezone, if this is a timezone error.
    pub fn invalid_timezone(&self) -> Option<&str> {
        match self {
            Self::Conversion(ical2org_core::Error::InvalidTimezone(tz)) => Some(tz),
            _ => None,
        }
    }
}
