//! Errors raised while encoding or exporting OTLP/JSON documents.
use opentelemetry_sdk::error::OTelSdkError;
use serde_json::error::Category;
use std::sync::PoisonError;
use thiserror::Error;

/// Result type returned by encoders and exporters in this crate.
pub type OtlpJsonResult<T> = Result<T, OtlpJsonError>;

/// Errors that can occur while writing an OTLP/JSON document.
///
/// A failed call leaves a truncated, non-valid-JSON fragment in the sink. Callers
/// must discard whatever was written for the failed batch.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OtlpJsonError {
    /// The destination sink failed to accept bytes or to flush.
    #[error("failed to write OTLP/JSON document: {0}")]
    Io(#[from] std::io::Error),

    /// A value shape with no encoding in this crate reached the encoder.
    ///
    /// This is a configuration or programming defect, retrying the same batch
    /// fails the same way.
    #[error("unsupported attribute value: {0}")]
    UnsupportedValue(String),

    /// Histogram data point whose bucket counts do not match its bounds.
    #[error("histogram has {buckets} bucket counts for {bounds} explicit bounds, expected {}", .bounds + 1)]
    InvalidHistogram {
        /// Number of explicit bounds supplied.
        bounds: usize,
        /// Number of bucket counts supplied.
        buckets: usize,
    },

    /// Export was called after the exporter released its sink.
    #[error("exporter is shut down")]
    AlreadyShutdown,

    /// Other internal failures, such as a poisoned sink lock.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for OtlpJsonError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Io => OtlpJsonError::Io(err.into()),
            _ => OtlpJsonError::UnsupportedValue(err.to_string()),
        }
    }
}

impl<T> From<PoisonError<T>> for OtlpJsonError {
    fn from(err: PoisonError<T>) -> Self {
        OtlpJsonError::Other(format!("sink lock poisoned: {}", err))
    }
}

impl From<OtlpJsonError> for OTelSdkError {
    fn from(err: OtlpJsonError) -> Self {
        match err {
            OtlpJsonError::AlreadyShutdown => OTelSdkError::AlreadyShutdown,
            other => OTelSdkError::InternalFailure(other.to_string()),
        }
    }
}
