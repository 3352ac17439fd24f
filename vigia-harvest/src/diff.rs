//! Snapshot diffing: membership and field-modification detection.
//!
//! Compares two unordered record sets keyed by id and emits two independent
//! event streams: records present in exactly one snapshot (appeared /
//! disappeared) and changed column values for records present in both. Both
//! streams carry one shared timestamp identifying the comparison run and are
//! returned sorted by `(timestamp, id, columna|tipo)`, the audit logs'
//! persistence order.

use std::collections::BTreeSet;

use serde_json::Value;

use vigia_core::{
    value_to_cell, MembershipEvent, MembershipKind, ModificationEvent, Record, Snapshot,
};

/// Events produced by one diff invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub modifications: Vec<ModificationEvent>,
    pub memberships: Vec<MembershipEvent>,
}

/// Compare `previous` and `current`.
///
/// Modification detection is restricted to ids present in both snapshots and
/// columns present in both snapshots' field sets (identity column excluded).
/// A value pair counts as modified when the values differ and not both are
/// absent; JSON null and a missing key are the same "absent".
pub fn diff(previous: &Snapshot, current: &Snapshot, timestamp: &str) -> DiffResult {
    let mut memberships = Vec::new();

    for id in current.ids().filter(|id| !previous.contains(*id)) {
        if let Some(record) = current.get(id) {
            memberships.push(membership_event(
                timestamp,
                id,
                record,
                MembershipKind::Appeared,
            ));
        }
    }
    for id in previous.ids().filter(|id| !current.contains(*id)) {
        if let Some(record) = previous.get(id) {
            memberships.push(membership_event(
                timestamp,
                id,
                record,
                MembershipKind::Disappeared,
            ));
        }
    }

    let shared_columns: BTreeSet<String> = previous
        .columns()
        .intersection(&current.columns())
        .filter(|c| c.as_str() != "id")
        .cloned()
        .collect();

    let mut modifications = Vec::new();
    for id in previous.ids().filter(|id| current.contains(*id)) {
        let (Some(old_record), Some(new_record)) = (previous.get(id), current.get(id)) else {
            continue;
        };
        for column in &shared_columns {
            let old = present(old_record.get(column));
            let new = present(new_record.get(column));
            // Both-absent compares equal here, so absent-vs-absent never
            // emits an event.
            if old == new {
                continue;
            }
            modifications.push(ModificationEvent {
                timestamp: timestamp.to_string(),
                id,
                entity: entity_of(old_record),
                name: name_of(old_record),
                column: column.clone(),
                old: cell(old),
                new: cell(new),
            });
        }
    }

    memberships.sort_by(|a, b| {
        (&a.timestamp, a.id, a.kind).cmp(&(&b.timestamp, b.id, b.kind))
    });
    modifications.sort_by(|a, b| {
        (&a.timestamp, a.id, &a.column).cmp(&(&b.timestamp, b.id, &b.column))
    });

    DiffResult {
        modifications,
        memberships,
    }
}

/// JSON null and a missing key are both "absent".
fn present(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Null) | None => None,
        some => some,
    }
}

fn cell(value: Option<&Value>) -> String {
    value.map(value_to_cell).unwrap_or_default()
}

fn entity_of(record: &Record) -> String {
    cell(present(record.get("entidad.nombre")))
}

fn name_of(record: &Record) -> String {
    cell(present(record.get("nombre")))
}

fn membership_event(
    timestamp: &str,
    id: i64,
    record: &Record,
    kind: MembershipKind,
) -> MembershipEvent {
    MembershipEvent {
        timestamp: timestamp.to_string(),
        id,
        entity: entity_of(record),
        name: name_of(record),
        kind,
    }
}
