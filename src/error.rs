//! Error types for the md2hwpx library.

use std::io;
use thiserror::Error;

/// Result type alias for md2hwpx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The reference package is missing, not a valid archive, or lacks a
    /// required part.
    #[error("Template error: {0}")]
    Template(String),

    /// A resolved style reference points at a property that does not exist
    /// in the style part.
    #[error("Style error: {0}")]
    Style(String),

    /// Image data could not be read or decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// A resource limit or path restriction was violated.
    #[error("Security violation: {0}")]
    Security(String),

    /// The input AST is malformed or exceeds the nesting limit.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Error reading or writing the zip container.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error parsing or serializing XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error deserializing the input AST.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Template("missing Contents/header.xml".to_string());
        assert_eq!(err.to_string(), "Template error: missing Contents/header.xml");

        let err = Error::Security("path traversal in 'a/../b'".to_string());
        assert_eq!(err.to_string(), "Security violation: path traversal in 'a/../b'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
