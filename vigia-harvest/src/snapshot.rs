//! JSONL snapshot and error store.
//!
//! One flattened record per line, sorted by id, rewritten in full each run.
//! Writes go to `<path>.tmp` and rename over the final path, so a crash
//! mid-write leaves the last completed run's files untouched.

use std::fs;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use vigia_core::{FetchFailure, Record, Snapshot};

use crate::error::{io_err, HarvestError};

/// Load the previous run's snapshot.
///
/// An absent file yields `None`: first run, nothing to diff against.
/// A malformed line is fatal: diffing against a partial snapshot would
/// fabricate membership events.
pub fn load(path: &Path) -> Result<Option<Snapshot>, HarvestError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| io_err(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)?;
        records.push(record);
    }
    Ok(Some(Snapshot::from_records(records)?))
}

/// Persist the current snapshot atomically, records in ascending id order.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), HarvestError> {
    let mut buf = String::new();
    for record in snapshot.records() {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }
    write_atomic(path, buf.as_bytes())
}

/// Persist the unresolved-failure set, overwriting the previous run's file.
///
/// Written even when empty: a stale error file surviving a clean run would
/// misreport failures.
pub fn save_errors(path: &Path, failures: &[FetchFailure]) -> Result<(), HarvestError> {
    let mut buf = String::new();
    for failure in failures {
        buf.push_str(&serde_json::to_string(failure)?);
        buf.push('\n');
    }
    write_atomic(path, buf.as_bytes())
}

/// Write to `<path>.tmp`, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
