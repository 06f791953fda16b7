// Error taxonomy for archive retrieval and alignment
use thiserror::Error;

/// Failure reported by the query-execution collaborator for one partition
/// window. `recoverable` means the backend is reachable but this particular
/// query failed (stale/tombstoned rows, in-band query error); the fetch
/// continues and the window contributes no samples. Unrecoverable failures
/// abort the fetch.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub recoverable: bool,
}

impl BackendError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// Bad or backwards time interval. Caller bug, never retried.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    /// Attribute name could not be resolved by the catalog.
    #[error("attribute not found: {0}")]
    NotFound(String),

    /// A partition query failed; see `BackendError::recoverable`.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A value was requested in a representation its type cannot provide.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        from: &'static str,
        to: &'static str,
    },

    /// Alignment preconditions unmet (empty input, no common point).
    #[error("cannot align empty series: {0}")]
    EmptySeries(String),

    /// Malformed raw value from the backend.
    #[error("decode error: {0}")]
    Decode(String),
}
