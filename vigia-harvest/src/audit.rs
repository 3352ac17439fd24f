//! Append-only audit logs.
//!
//! Two CSV logs accumulate across runs: `modificaciones.csv` (changed column
//! values) and `adiciones.csv` (appearances/disappearances). Each append
//! re-sorts the whole log by its `(timestamp, id, columna|tipo)` key before
//! rewriting atomically; ordering is part of the audit contract.

use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use vigia_core::{MembershipEvent, ModificationEvent};

use crate::error::{io_err, HarvestError};
use crate::snapshot::write_atomic;

/// Append modification events to the log at `path`.
pub fn append_modifications(
    path: &Path,
    events: &[ModificationEvent],
) -> Result<(), HarvestError> {
    append_sorted(path, events, |e| {
        (e.timestamp.clone(), e.id, e.column.clone())
    })
}

/// Append membership events to the log at `path`.
pub fn append_memberships(path: &Path, events: &[MembershipEvent]) -> Result<(), HarvestError> {
    append_sorted(path, events, |e| {
        (e.timestamp.clone(), e.id, e.kind.to_string())
    })
}

/// Read the existing log (if any), append, sort, rewrite atomically.
///
/// With no new events the log is left untouched; logs only come into
/// existence on the first recorded change.
fn append_sorted<T, K>(
    path: &Path,
    new_events: &[T],
    key: impl Fn(&T) -> K,
) -> Result<(), HarvestError>
where
    T: Serialize + DeserializeOwned + Clone,
    K: Ord,
{
    if new_events.is_empty() {
        return Ok(());
    }

    let mut events: Vec<T> = read_existing(path)?;
    events.extend(new_events.iter().cloned());
    events.sort_by_key(|e| key(e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    for event in &events {
        writer.serialize(event)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| io_err(path, std::io::Error::other(e.to_string())))?;
    write_atomic(path, &bytes)
}

fn read_existing<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, HarvestError> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(err) => match err.kind() {
            csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            _ => return Err(HarvestError::Csv(err)),
        },
    };

    let mut events = Vec::new();
    for row in reader.deserialize() {
        events.push(row?);
    }
    Ok(events)
}
