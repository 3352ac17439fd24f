//! Vigia core library: domain types, payload flattening, errors.
//!
//! Public API surface:
//! - [`types`]: listing refs, records, snapshots, audit events
//! - [`flatten`]: nested payload to dot-joined flat record
//! - [`error`]: [`CoreError`]

pub mod error;
pub mod flatten;
pub mod types;

pub use error::CoreError;
pub use flatten::flatten;
pub use types::{
    record_id, run_timestamp, value_to_cell, FetchFailure, ListingPage, MembershipEvent,
    MembershipKind, ModificationEvent, Record, RecordRef, RunSummary, Snapshot,
};
