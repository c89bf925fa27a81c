#![forbid(unsafe_code)]

//! Snapshot codec: serialize field values for durable storage and restore
//! them back into a field store.
//!
//! The codec is a pure data transform. It knows nothing about visibility —
//! encoding captures **all** non-empty values regardless of which blocks are
//! currently shown; filtering for progress and summaries is the caller's
//! concern. The one exclusion is transport-reserved (meta) names, which are
//! recomputed at submit time and must never round-trip through storage.
//!
//! # Persisted shape
//!
//! ```json
//! {
//!   "timestamp": 1756300000000,
//!   "startTime": 1756299000000,
//!   "fields": {
//!     "mood": "bad",
//!     "triggers": ["work", "sleep"]
//!   }
//! }
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `SnapshotError::Corrupt` | Malformed persisted JSON | Caller logs, proceeds as if absent |
//! | Unknown field name on restore | Schema drift | Entry skipped, warned |
//! | Scalar stored for a multi-choice field | Older writer | Treated as a one-element set |
//! | List stored for a scalar kind | Older writer | First element wins |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{FieldKind, FieldStore, FieldValue};
use crate::registry::FieldRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Snapshot decode failures.
#[derive(Debug)]
pub enum SnapshotError {
    /// Persisted data could not be parsed. Recovered by treating the
    /// snapshot as absent; never fatal.
    Corrupt(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Corrupt(msg) => write!(f, "corrupt snapshot: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Result alias for codec operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One persisted field value: scalar or list, untagged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedValue {
    /// Text or selected choice.
    Scalar(String),
    /// Multi-choice selections.
    Many(Vec<String>),
}

/// A complete persisted record of field values plus session timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Capture time, epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub captured_at_ms: u64,
    /// Session start, epoch milliseconds.
    #[serde(rename = "startTime")]
    pub session_start_ms: u64,
    /// Non-empty field values, keyed by field name. Never contains
    /// transport-reserved names.
    pub fields: BTreeMap<String, PersistedValue>,
}

impl Snapshot {
    /// Parse a persisted snapshot from its JSON encoding.
    pub fn from_json(raw: &str) -> SnapshotResult<Self> {
        serde_json::from_str(raw).map_err(|e| SnapshotError::Corrupt(e.to_string()))
    }

    /// Encode to the persisted JSON form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serialization of string/vec maps cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outcome of a restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries applied to the store.
    pub applied: usize,
    /// Entries skipped: unknown names or reserved prefixes.
    pub skipped: usize,
}

/// Capture all non-empty, non-meta field values into a snapshot.
#[must_use]
pub fn encode(
    registry: &FieldRegistry,
    store: &dyn FieldStore,
    session_start_ms: u64,
    now_ms: u64,
) -> Snapshot {
    let mut fields = BTreeMap::new();
    for desc in registry.descriptors() {
        if desc.meta_excluded {
            continue;
        }
        let value = match registry.resolve(store, &desc.name) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(field = %desc.name, error = %e, "encode skipped unresolvable field");
                continue;
            }
        };
        if value.is_empty() {
            continue;
        }
        let persisted = match value {
            FieldValue::Text(s) => PersistedValue::Scalar(s),
            FieldValue::Choice(Some(v)) => PersistedValue::Scalar(v),
            FieldValue::Choice(None) => continue,
            FieldValue::Selections(s) => PersistedValue::Many(s.into_iter().collect()),
        };
        fields.insert(desc.name.clone(), persisted);
    }
    Snapshot {
        captured_at_ms: now_ms,
        session_start_ms,
        fields,
    }
}

/// Apply a snapshot's values back through the registry.
///
/// Tolerant by design: unknown names are skipped (schema drift is not an
/// error), reserved names are never restored, and shape drift between scalar
/// and list encodings is coerced per the table in the module docs.
pub fn restore(
    snapshot: &Snapshot,
    registry: &FieldRegistry,
    store: &mut dyn FieldStore,
) -> RestoreReport {
    let mut report = RestoreReport::default();
    for (name, persisted) in &snapshot.fields {
        let prefix = registry.meta_prefix();
        if !prefix.is_empty() && name.starts_with(prefix) {
            tracing::warn!(field = %name, "snapshot carried a reserved name, skipping");
            report.skipped += 1;
            continue;
        }
        let Some(desc) = registry.descriptor(name) else {
            tracing::warn!(field = %name, "snapshot field no longer in schema, skipping");
            report.skipped += 1;
            continue;
        };
        let value = coerce(persisted, desc.kind);
        store.apply(name, value);
        report.applied += 1;
    }
    tracing::debug!(applied = report.applied, skipped = report.skipped, "snapshot restored");
    report
}

/// Reshape a persisted value to the declared field kind.
fn coerce(persisted: &PersistedValue, kind: FieldKind) -> FieldValue {
    match (persisted, kind) {
        (PersistedValue::Scalar(s), FieldKind::Single) => FieldValue::Text(s.clone()),
        (PersistedValue::Scalar(s), FieldKind::SingleChoiceGroup) => {
            FieldValue::Choice(Some(s.clone()))
        }
        (PersistedValue::Scalar(s), FieldKind::MultiChoiceGroup) => {
            FieldValue::selections([s.clone()])
        }
        (PersistedValue::Many(v), FieldKind::MultiChoiceGroup) => {
            FieldValue::Selections(v.iter().cloned().collect())
        }
        (PersistedValue::Many(v), FieldKind::Single) => {
            FieldValue::Text(v.first().cloned().unwrap_or_default())
        }
        (PersistedValue::Many(v), FieldKind::SingleChoiceGroup) => {
            FieldValue::Choice(v.first().cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{InputElement, InputModality, MemoryFieldStore};

    fn registry() -> FieldRegistry {
        let elements = vec![
            InputElement::new("mood", InputModality::Radio),
            InputElement::new("reason", InputModality::Text),
            InputElement::new("triggers", InputModality::Checkbox),
            InputElement::new("_mf_duration", InputModality::Text),
        ];
        FieldRegistry::classify(&elements, "_mf_").unwrap()
    }

    #[test]
    fn encode_skips_empty_and_meta_fields() {
        let registry = registry();
        let mut store = MemoryFieldStore::new();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        registry
            .apply(&mut store, "_mf_duration", FieldValue::Text("5".into()))
            .unwrap();

        let snap = encode(&registry, &store, 100, 200);
        assert_eq!(snap.fields.len(), 1);
        assert_eq!(
            snap.fields["mood"],
            PersistedValue::Scalar("bad".into())
        );
    }

    #[test]
    fn wire_shape_matches_contract() {
        let registry = registry();
        let mut store = MemoryFieldStore::new();
        registry
            .apply(&mut store, "triggers", FieldValue::selections(["sleep", "work"]))
            .unwrap();
        registry
            .apply(&mut store, "reason", FieldValue::Text("tired".into()))
            .unwrap();

        let snap = encode(&registry, &store, 10, 20);
        let json: serde_json::Value = serde_json::from_str(&snap.to_json()).unwrap();
        assert_eq!(json["timestamp"], 20);
        assert_eq!(json["startTime"], 10);
        assert_eq!(json["fields"]["reason"], "tired");
        assert_eq!(
            json["fields"]["triggers"],
            serde_json::json!(["sleep", "work"])
        );
    }

    #[test]
    fn round_trip_restores_equal_values() {
        let registry = registry();
        let mut store = MemoryFieldStore::new();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        registry
            .apply(&mut store, "reason", FieldValue::Text("tired".into()))
            .unwrap();
        registry
            .apply(&mut store, "triggers", FieldValue::selections(["work", "sleep"]))
            .unwrap();

        let snap = Snapshot::from_json(&encode(&registry, &store, 1, 2).to_json()).unwrap();
        let mut fresh = MemoryFieldStore::new();
        let report = restore(&snap, &registry, &mut fresh);

        assert_eq!(report.applied, 3);
        assert_eq!(report.skipped, 0);
        for name in ["mood", "reason", "triggers"] {
            assert_eq!(
                registry.resolve(&fresh, name).unwrap(),
                registry.resolve(&store, name).unwrap()
            );
        }
    }

    #[test]
    fn unknown_field_is_skipped_not_an_error() {
        let registry = registry();
        let snap = Snapshot::from_json(
            r#"{"timestamp":2,"startTime":1,"fields":{"legacy":"x","mood":"ok"}}"#,
        )
        .unwrap();
        let mut store = MemoryFieldStore::new();
        let report = restore(&snap, &registry, &mut store);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn scalar_for_multi_choice_becomes_one_element_set() {
        let registry = registry();
        let snap = Snapshot::from_json(
            r#"{"timestamp":2,"startTime":1,"fields":{"triggers":"work"}}"#,
        )
        .unwrap();
        let mut store = MemoryFieldStore::new();
        restore(&snap, &registry, &mut store);
        assert_eq!(
            registry.resolve(&store, "triggers").unwrap(),
            FieldValue::selections(["work"])
        );
    }

    #[test]
    fn list_for_a_scalar_kind_takes_the_first_element() {
        let registry = registry();
        let snap = Snapshot::from_json(
            r#"{"timestamp":2,"startTime":1,"fields":{"reason":["a","b"],"mood":["x"]}}"#,
        )
        .unwrap();
        let mut store = MemoryFieldStore::new();
        let report = restore(&snap, &registry, &mut store);
        assert_eq!(report.applied, 2);
        assert_eq!(
            registry.resolve(&store, "reason").unwrap(),
            FieldValue::Text("a".into())
        );
        assert_eq!(
            registry.resolve(&store, "mood").unwrap(),
            FieldValue::Choice(Some("x".into()))
        );
    }

    #[test]
    fn reserved_names_are_never_restored() {
        let registry = registry();
        let snap = Snapshot::from_json(
            r#"{"timestamp":2,"startTime":1,"fields":{"_mf_duration":"7"}}"#,
        )
        .unwrap();
        let mut store = MemoryFieldStore::new();
        let report = restore(&snap, &registry, &mut store);
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped, 1);
        assert!(registry.resolve(&store, "_mf_duration").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_corrupt() {
        assert!(matches!(
            Snapshot::from_json("{not json"),
            Err(SnapshotError::Corrupt(_))
        ));
        assert!(matches!(
            Snapshot::from_json(r#"{"fields":{}}"#),
            Err(SnapshotError::Corrupt(_))
        ));
    }
}
