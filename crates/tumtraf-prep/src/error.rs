// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for dataset preparation and dataset access.
///
/// Fatal conditions (bad roots, unreadable configuration) surface as an
/// `Error` from the entry point. Per-file failures inside batch passes are
/// reported through the pass reports instead so a single bad frame does not
/// abort a whole split.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// Image decode or encode error.
    ImageError(image::ImageError),
    /// Directory traversal error.
    WalkDirError(walkdir::Error),
    /// Integer parsing error.
    ParseIntError(std::num::ParseIntError),
    /// A required root is missing or is not a directory.
    InvalidDirectory(PathBuf),
    /// A frame stem does not follow `YYYYMMDD-HHMMSS.ffffff`.
    MalformedTimestamp(String),
    /// An index lookup references an image file that does not exist.
    MissingAsset(PathBuf),
    /// The key does not address an entry of the index.
    InvalidKey(String),
    /// The region of interest could not be loaded or is degenerate.
    InvalidRoi(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err)
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
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::WalkDirError(e) => write!(f, "Directory walk error: {}", e),
            Error::ParseIntError(e) => write!(f, "Integer parse error: {}", e),
            Error::InvalidDirectory(p) => write!(f, "Invalid directory: {:?}", p),
            Error::MalformedTimestamp(s) => write!(f, "Malformed timestamp: {:?}", s),
            Error::MissingAsset(p) => write!(f, "Missing asset: {:?}", p),
            Error::InvalidKey(s) => write!(f, "Invalid index key: {}", s),
            Error::InvalidRoi(s) => write!(f, "Invalid region of interest: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            Error::WalkDirError(e) => Some(e),
            Error::ParseIntError(e) => Some(e),
            _ => None,
        }
    }
}
