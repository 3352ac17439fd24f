//! Error types for vigia-core.

use thiserror::Error;

/// All errors that can arise from core record handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A flattened record is missing its `id` field.
    #[error("record has no 'id' field")]
    MissingId,

    /// The `id` field is present but not an integer.
    #[error("record 'id' is not an integer: {value}")]
    NonIntegerId { value: String },
}
