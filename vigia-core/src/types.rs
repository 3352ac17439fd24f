//! Domain types for the trámite harvester.
//!
//! Serialized field names follow the upstream catalog's Spanish vocabulary
//! (`nombre`, `entidad`, `columna`, …) so persisted files line up with what
//! the remote API and the audit-log consumers expect; Rust-side names stay
//! English.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Listing types
// ---------------------------------------------------------------------------

/// Lightweight listing entry: the identity of one procedure as reported by
/// the paginated catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub slug: String,
}

/// One page of the listing endpoint, after unwrapping the API envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Server-reported total across all pages.
    pub total: u64,
    /// Rows of this page, in server order.
    pub rows: Vec<RecordRef>,
}

// ---------------------------------------------------------------------------
// Records and snapshots
// ---------------------------------------------------------------------------

/// A flattened procedure record: dot-joined key paths to scalar (or array)
/// JSON values. Always carries an integer `id`.
pub type Record = BTreeMap<String, Value>;

/// Extract the integer `id` of a flattened record.
pub fn record_id(record: &Record) -> Result<i64, CoreError> {
    match record.get("id") {
        Some(value) => value.as_i64().ok_or_else(|| CoreError::NonIntegerId {
            value: value.to_string(),
        }),
        None => Err(CoreError::MissingId),
    }
}

/// The full record set captured by one harvester run, keyed by record id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: BTreeMap<i64, Record>,
}

impl Snapshot {
    /// Build a snapshot from flattened records.
    ///
    /// A record without an integer `id` is an error. Duplicate ids keep the
    /// last occurrence, matching re-keying by id downstream.
    pub fn from_records<I>(records: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut keyed = BTreeMap::new();
        for record in records {
            let id = record_id(&record)?;
            keyed.insert(id, record);
        }
        Ok(Self { records: keyed })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Record ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.records.keys().copied()
    }

    /// Records in ascending id order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Union of column names across all records in this snapshot.
    pub fn columns(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|r| r.keys().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Fetch failures
// ---------------------------------------------------------------------------

/// A listing entry whose detail fetch exhausted its retries, annotated with
/// the failure message. Eligible for residual-retry passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub slug: String,
    pub error: String,
}

impl FetchFailure {
    pub fn new(reference: &RecordRef, error: impl fmt::Display) -> Self {
        Self {
            id: reference.id,
            name: reference.name.clone(),
            slug: reference.slug.clone(),
            error: error.to_string(),
        }
    }

    /// Recover the listing entry for a residual-retry pass.
    pub fn to_ref(&self) -> RecordRef {
        RecordRef {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Audit events
// ---------------------------------------------------------------------------

/// A single changed column value for a record present in both snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationEvent {
    pub timestamp: String,
    pub id: i64,
    #[serde(rename = "entidad")]
    pub entity: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "columna")]
    pub column: String,
    #[serde(rename = "viejo")]
    pub old: String,
    #[serde(rename = "nuevo")]
    pub new: String,
}

/// Whether a record appeared in or disappeared from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MembershipKind {
    #[serde(rename = "aparece")]
    Appeared,
    #[serde(rename = "desaparece")]
    Disappeared,
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipKind::Appeared => write!(f, "aparece"),
            MembershipKind::Disappeared => write!(f, "desaparece"),
        }
    }
}

/// A record present in exactly one of two compared snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub timestamp: String,
    pub id: i64,
    #[serde(rename = "entidad")]
    pub entity: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: MembershipKind,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Final counts for one harvester run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub errored: usize,
    pub appeared: usize,
    pub disappeared: usize,
    pub modified: usize,
}

/// Render a JSON value as an audit-log cell: strings unquoted, everything
/// else in compact JSON form.
pub fn value_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a run timestamp at minute precision, e.g. `2026-08-26T12:34+00:00`.
///
/// One such value is shared by every event of a single diff invocation.
pub fn run_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M%:z").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
