//! Error types for lofi-ap
//!
//! Media element failures stay as [`MediaError`](crate::playback::MediaError)
//! and are reported as events; everything a caller can get back from the
//! engine, the native host or startup lands here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors bubbled up from the shared library
    #[error(transparent)]
    Common(#[from] lofi_common::Error),

    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Device enumeration, stream build or stream control failures
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Unknown track id or ambient key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed command line
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
