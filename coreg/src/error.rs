//! Error types for co-registration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, aligning or writing band images.
///
/// Every per-file variant carries the path so that the batch driver can log
/// the failure and move on to the next record.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode image '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode image '{path}': {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Unsupported image format for '{path}': {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
