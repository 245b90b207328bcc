// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for every stage of the dataset curation pipeline.
///
/// Wrapped variants carry the underlying library error so callers can reach
/// it through [`std::error::Error::source`]. The remaining variants describe
/// malformed input or configuration and carry a human-readable context.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Directory traversal error.
    WalkDirError(walkdir::Error),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Polars dataframe operation error.
    PolarsError(polars::error::PolarsError),
    /// Image decoding or encoding error.
    ImageError(image::ImageError),
    /// Integer parsing error.
    ParseIntError(std::num::ParseIntError),
    /// A class directory name does not follow the `<plant>___<disease>`
    /// convention.
    MalformedLabel(String),
    /// A required column is missing from a table, or a requested target
    /// column does not exist.
    MissingColumn(String),
    /// An image referenced by a dataset row does not exist on disk.
    MissingImage(String),
    /// Unsupported file format.
    UnsupportedFormat(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(err: polars::error::PolarsError) -> Self {
        Error::PolarsError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseIntError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::WalkDirError(e) => write!(f, "Directory walk error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::PolarsError(e) => write!(f, "Polars error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::ParseIntError(e) => write!(f, "Integer parse error: {}", e),
            Error::MalformedLabel(s) => write!(f, "Malformed class label: {}", s),
            Error::MissingColumn(s) => write!(f, "Missing column: {}", s),
            Error::MissingImage(s) => write!(f, "Missing image: {}", s),
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::WalkDirError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::PolarsError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            Error::ParseIntError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::MalformedLabel("Tomato-healthy".to_owned());
        let display = format!("{}", err);
        assert!(display.contains("Malformed class label"));
        assert!(display.contains("Tomato-healthy"));
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.source().is_some());

        let err = Error::MissingColumn("Leaf #".to_owned());
        assert!(err.source().is_none());
    }
}
