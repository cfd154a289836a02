//! Error types for deck operations.

use thiserror::Error;

/// Result type for deck operations
pub type Result<T> = std::result::Result<T, PptxError>;

/// Errors that can occur while reading, cloning or writing a deck
#[derive(Error, Debug)]
pub enum PptxError {
    /// A required part is missing from the package
    #[error("Missing part: {path}")]
    MissingPart { path: String },

    /// The package structure is not a usable presentation
    #[error("Invalid package: {reason}")]
    InvalidPackage { reason: String },

    /// A slide position outside the deck was requested
    #[error("Slide position {position} is out of range (deck has {len} slides)")]
    IndexOutOfRange { position: usize, len: usize },

    /// XML parsing error
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// ZIP archive error
    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PptxError {
    /// Create a missing part error
    pub fn missing_part(path: impl Into<String>) -> Self {
        Self::MissingPart { path: path.into() }
    }

    /// Create an invalid package error
    pub fn invalid_package(reason: impl Into<String>) -> Self {
        Self::InvalidPackage {
            reason: reason.into(),
        }
    }

    /// Create an index out of range error for a 1-based position
    pub fn index_out_of_range(position: usize, len: usize) -> Self {
        Self::IndexOutOfRange { position, len }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPart { .. } => "PPTX001",
            Self::InvalidPackage { .. } => "PPTX002",
            Self::IndexOutOfRange { .. } => "PPTX003",
            Self::XmlError(_) => "PPTX004",
            Self::ZipError(_) => "PPTX005",
            Self::IoError(_) => "PPTX006",
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for PptxError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlError(quick_xml::Error::from(err))
    }
}

impl From<quick_xml::escape::EscapeError> for PptxError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::XmlError(quick_xml::Error::from(err))
    }
}
