//! Error types for sampling, the wire codec, sinks and the two loops.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reading a primary metric. Fatal to the current tick only.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: missing {what}", .path.display())]
    Missing { path: PathBuf, what: &'static str },
}

impl SampleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SampleError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to encode sample: {0}")]
    Json(#[from] serde_json::Error),
    #[error("refusing to encode {field} = {value}, outside [0, 100]")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Reasons an inbound datagram is rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("store i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize stored sample: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Start-up failures surfaced to `main`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
