//! Error types for trace-segments

use thiserror::Error;

/// Result type alias for trace-segments operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trace-segments
///
/// Construction errors are strict and always surface to the caller. Read
/// anomalies during extraction (invalid windows, failed slices) never show up
/// here: they degrade to empty results with a logged diagnostic.
#[derive(Error, Debug)]
pub enum Error {
    /// The tag descriptor cannot back a segment (e.g. multi-instance tag without index)
    #[error("Invalid segment descriptor: {0}")]
    InvalidSegmentDescriptor(String),

    /// Trace name not visible to the segment
    #[error("Unknown trace: {0}")]
    UnknownTrace(String),

    /// Feature name not attached to the segment's descriptor
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// The store could not service a slice or feature request
    #[error("Store read error: {0}")]
    StoreRead(String),

    /// Feature instance resolution found a mismatched entity graph
    #[error("Inconsistent segment state: {0}")]
    InconsistentSegmentState(String),

    /// Array type is neither a sampled nor an event trace
    #[error("Invalid trace: {0}")]
    InvalidTrace(String),

    /// Data link with an empty or inverted time range
    #[error("Invalid data link: {0}")]
    InvalidDataLink(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
