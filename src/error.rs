//! # Error Types
//!
//! This module defines error types used throughout the laurel library.

use thiserror::Error;

/// Main error type for laurel operations
#[derive(Debug, Error)]
pub enum LaurelError {
    /// Rejected input: missing template or name, bad layer, full recipient
    /// list, wizard step taken out of order
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Template bytes or data URL could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Rendered image could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// No usable font face
    #[error("Font error: {0}")]
    Font(String),

    /// Recipient CSV could not be parsed
    #[error("CSV error: {0}")]
    Csv(String),

    /// ZIP packaging failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Remote template download failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A single item failed and aborted the whole batch
    #[error("Failed to generate certificate for {recipient}: {source}")]
    Batch {
        recipient: String,
        #[source]
        source: Box<LaurelError>,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaurelError {
    /// True for errors caused by the caller's input rather than by processing.
    pub fn is_validation(&self) -> bool {
        matches!(self, LaurelError::Validation(_))
    }
}

impl From<image::ImageError> for LaurelError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Encoding(_) => LaurelError::Encode(e.to_string()),
            image::ImageError::IoError(io) => LaurelError::Io(io),
            other => LaurelError::Decode(other.to_string()),
        }
    }
}

impl From<csv::Error> for LaurelError {
    fn from(e: csv::Error) -> Self {
        LaurelError::Csv(e.to_string())
    }
}

impl From<zip::result::ZipError> for LaurelError {
    fn from(e: zip::result::ZipError) -> Self {
        LaurelError::Archive(e.to_string())
    }
}
