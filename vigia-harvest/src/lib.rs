//! # vigia-harvest
//!
//! Incremental harvesting and change-detection engine for the procedure
//! catalog: paginated listing, bounded-concurrency detail fetching with
//! retry, snapshot persistence, and snapshot-to-snapshot diffing into
//! append-only audit logs.
//!
//! Call [`pipeline::run`] for a complete harvester run.

pub mod audit;
pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod paginate;
pub mod pipeline;
pub mod retry;
pub mod snapshot;

pub use client::{CatalogClient, HttpCatalogClient};
pub use config::{HarvestConfig, MAX_BACKOFF};
pub use diff::{diff as diff_snapshots, DiffResult};
pub use error::HarvestError;
pub use fetch::fetch_details;
pub use paginate::list_all;
pub use pipeline::{run, DataPaths};
pub use retry::with_retry;
pub use vigia_core::ListingPage;
