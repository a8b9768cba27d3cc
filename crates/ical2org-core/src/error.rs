//! Error types for the conversion pipeline.
//!
//! Every failure is fatal for the run: the engine never emits a partial
//! outline, so callers only need to surface the message.

use thiserror::Error;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// The calendar source could not be decoded.
    #[error("Parsing error: {0}")]
    Decode(String),

    /// The requested timezone identifier is not known.
    #[error("Invalid timezone value {0}.")]
    InvalidTimezone(String),

    /// A recurrence rule (or its RDATE/EXDATE companions) could not be expanded.
    #[error("invalid recurrence in event {uid}: {message}")]
    Recurrence {
        /// UID of the offending event.
        uid: String,
        /// Diagnostic from the rule parser.
        message: String,
    },

    /// The markup converter failed on an event body.
    #[error("markup conversion failed: {0}")]
    Conversion(String),

    /// Reading the input or writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a decode error from any displayable diagnostic.
    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode(message.to_string())
    }

    /// Creates a conversion error from any displayable diagnostic.
    pub fn conversion(message: impl std::fmt::Display) -> Self {
        Self::Conversion(message.to_string())
    }

    /// Creates a recurrence error for the event with the given UID.
    pub fn recurrence(uid: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Recurrence {
            uid: uid.into(),
            message: message.to_string(),
        }
    }
}
