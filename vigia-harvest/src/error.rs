//! Error types for vigia-harvest.
//!
//! Retry classification is a pure function of the error value
//! ([`HarvestError::is_retryable`]); nothing in the pipeline inspects
//! exception-style state.

use std::path::PathBuf;

use thiserror::Error;

use vigia_core::CoreError;

/// All errors that can arise from harvesting operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Transport-level HTTP failure (connect, timeout, reset, body read).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the remote API.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body did not match the expected envelope.
    #[error("malformed response from {url}: {detail}")]
    Malformed { url: String, detail: String },

    /// A listing page could not be fetched within the configured attempt cap.
    #[error("listing page {page} failed after {attempts} attempts: {source}")]
    ListingExhausted {
        page: u32,
        attempts: u32,
        #[source]
        source: Box<HarvestError>,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error (snapshot / error store).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV (de)serialization error (audit logs).
    #[error("audit log CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A record that cannot be keyed (missing or non-integer id).
    #[error("record error: {0}")]
    Record(#[from] CoreError),
}

impl HarvestError {
    /// Whether a failed fetch is worth retrying.
    ///
    /// Transient classes: transport errors (timeouts, connection resets) and
    /// HTTP 5xx / 429. Malformed payloads and other 4xx statuses are
    /// permanent for the current attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Http { .. } => true,
            HarvestError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Convenience constructor for [`HarvestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HarvestError {
    HarvestError::Io {
        path: path.into(),
        source,
    }
}
