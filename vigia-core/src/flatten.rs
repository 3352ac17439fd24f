//! Flattening of nested API payloads into single-level records.
//!
//! Nested objects collapse to dot-joined key paths (`entidad.nombre`);
//! arrays and scalars are kept verbatim. This is the only shaping applied to
//! detail payloads before snapshotting and diffing.

use serde_json::{Map, Value};

use crate::types::Record;

/// Flatten a detail payload into a [`Record`].
///
/// Non-object payloads produce an empty record; the caller decides whether
/// that is an error (a detail response without fields is malformed).
pub fn flatten(value: &Value) -> Record {
    let mut out = Record::new();
    if let Value::Object(map) = value {
        flatten_into(&mut out, "", map);
    }
    out
}

fn flatten_into(out: &mut Record, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(out, &path, inner),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_become_dot_paths() {
        let flat = flatten(&json!({
            "id": 12,
            "nombre": "Licencia",
            "entidad": { "nombre": "Ministerio", "sigla": "MIN" }
        }));

        assert_eq!(flat["id"], json!(12));
        assert_eq!(flat["entidad.nombre"], json!("Ministerio"));
        assert_eq!(flat["entidad.sigla"], json!("MIN"));
        assert!(!flat.contains_key("entidad"));
    }

    #[test]
    fn deep_nesting_joins_every_level() {
        let flat = flatten(&json!({"a": {"b": {"c": 1}}}));
        assert_eq!(flat["a.b.c"], json!(1));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn arrays_and_nulls_are_kept_verbatim() {
        let flat = flatten(&json!({
            "requisitos": ["carnet", "formulario"],
            "costo": null
        }));
        assert_eq!(flat["requisitos"], json!(["carnet", "formulario"]));
        assert_eq!(flat["costo"], Value::Null);
    }

    #[test]
    fn non_object_payload_flattens_to_empty() {
        assert!(flatten(&json!("texto")).is_empty());
        assert!(flatten(&json!([1, 2, 3])).is_empty());
    }
}
