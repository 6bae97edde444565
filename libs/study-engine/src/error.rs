//! Error types for study-engine.

use thiserror::Error;

/// Result type alias using TransferError.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors raised while importing a state snapshot.
///
/// Selection and update never fail; only persisted data that is
/// structurally invalid is rejected.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("record {id}: {field} out of range")]
    OutOfRange { id: String, field: &'static str },
}
