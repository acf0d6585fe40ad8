//! Shared error type across reqmeter crates.

use thiserror::Error;

/// Stable error categories (used by config validation tests and logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration.
    Config,
    /// Constant label rejected (reserved or malformed name).
    InvalidLabel,
    /// Metric namespace/subsystem/name is not a valid metric identifier.
    InvalidName,
    /// Metric name already registered on the sink.
    Registration,
    /// Sink-side failure that does not fit any other category.
    Sink,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::InvalidLabel => "INVALID_LABEL",
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::Registration => "REGISTRATION",
            ErrorKind::Sink => "SINK",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ReqMeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum ReqMeterError {
    #[error("config: {0}")]
    Config(String),
    #[error("label `{0}` is reserved for per-request labels")]
    ReservedLabel(String),
    #[error("invalid label name: {0:?}")]
    InvalidLabelName(String),
    #[error("invalid metric name: {0:?}")]
    InvalidMetricName(String),
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
    #[error("metric `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("metric `{0}` is already registered with a different label schema")]
    SchemaMismatch(String),
    #[error("sink: {0}")]
    Sink(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ReqMeterError {
    /// Map an error onto its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReqMeterError::Config(_) | ReqMeterError::InvalidBuckets(_) => ErrorKind::Config,
            ReqMeterError::ReservedLabel(_) | ReqMeterError::InvalidLabelName(_) => {
                ErrorKind::InvalidLabel
            }
            ReqMeterError::InvalidMetricName(_) => ErrorKind::InvalidName,
            ReqMeterError::AlreadyRegistered(_) | ReqMeterError::SchemaMismatch(_) => {
                ErrorKind::Registration
            }
            ReqMeterError::Sink(_) => ErrorKind::Sink,
            ReqMeterError::Internal(_) => ErrorKind::Internal,
        }
    }
}
