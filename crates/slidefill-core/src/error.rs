//! Error types for the fill pipeline.

use std::path::PathBuf;

use slidefill_data::DataError;
use slidefill_pptx::PptxError;
use thiserror::Error;

/// Result type for fill operations
pub type Result<T> = std::result::Result<T, FillError>;

/// Errors that stop a fill run
///
/// Problems that only affect one mapping entry or one slide are reported as
/// [`crate::report::Issue`]s instead and never surface here.
#[derive(Error, Debug)]
pub enum FillError {
    /// Deck could not be read, cloned or written
    #[error(transparent)]
    Pptx(#[from] PptxError),

    /// Data source could not be read
    #[error(transparent)]
    Data(#[from] DataError),

    /// Mapping or settings file is unusable as a whole
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// A plan position fell outside the deck and the policy is to abort
    #[error("Slide position {position} is out of range (deck has {len} slides)")]
    IndexOutOfRange { position: usize, len: usize },

    /// Output location is unusable
    #[error("Cannot write output {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FillError {
    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create an output error
    pub fn output(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Output {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pptx(err) => err.code(),
            Self::Data(_) => "DATA001",
            Self::Config { .. } => "FILL101",
            Self::IndexOutOfRange { .. } => "FILL103",
            Self::Output { .. } => "FILL104",
            Self::Io(_) => "FILL105",
        }
    }
}

impl From<serde_json::Error> for FillError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("invalid mapping JSON: {}", err))
    }
}

impl From<toml::de::Error> for FillError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("invalid settings TOML: {}", err))
    }
}
