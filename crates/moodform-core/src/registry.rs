#![forbid(unsafe_code)]

//! Field registry: schema classification and validated value access.
//!
//! [`FieldRegistry::classify`] collapses the schema's flat element list into
//! one [`FieldDescriptor`] per logical name, in first-appearance order. All
//! engine reads and writes go through the registry so that field names and
//! value shapes are validated once, at the schema seam, instead of re-checked
//! ad hoc at every call site.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `SchemaError::ModalityConflict` | Same name, conflicting modality | Classification fails; malformed markup upstream |
//! | `RegistryError::UnknownField` | Name not in schema | Apply/resolve rejected |
//! | `RegistryError::KindMismatch` | Value shape vs. descriptor kind | Apply rejected (restore path coerces instead, see `snapshot`) |

use std::collections::HashMap;
use std::fmt;

use crate::field::{FieldDescriptor, FieldKind, FieldStore, FieldValue, InputElement};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Startup-time schema diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two elements share a name but collapse to different field kinds.
    ModalityConflict {
        /// The conflicted field name.
        name: String,
        /// Kind established by the first element carrying the name.
        first: FieldKind,
        /// Conflicting kind of a later element.
        second: FieldKind,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::ModalityConflict { name, first, second } => write!(
                f,
                "field `{name}` declared as both {first} and {second}"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Runtime field-access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The named field is not part of the schema.
    UnknownField(String),
    /// The supplied value's shape does not match the descriptor kind.
    KindMismatch {
        /// The field name.
        name: String,
        /// Kind declared by the schema.
        expected: FieldKind,
        /// Kind of the supplied value.
        got: FieldKind,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownField(name) => write!(f, "unknown field `{name}`"),
            RegistryError::KindMismatch { name, expected, got } => write!(
                f,
                "field `{name}` expects a {expected} value, got {got}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered, deduplicated view of the form schema.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    descriptors: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    meta_prefix: String,
}

impl FieldRegistry {
    /// Classify a flat element list into logical fields.
    ///
    /// Elements sharing a name collapse into one descriptor; order follows
    /// first appearance. Names starting with `meta_prefix` are marked
    /// meta-excluded. A name declared under conflicting modalities is a
    /// schema error, reported rather than silently resolved.
    pub fn classify(
        elements: &[InputElement],
        meta_prefix: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let meta_prefix = meta_prefix.into();
        let mut descriptors: Vec<FieldDescriptor> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for element in elements {
            let kind = element.modality.kind();
            let email = matches!(element.modality, crate::field::InputModality::Email);
            match index.get(&element.name) {
                Some(&i) => {
                    let existing = &mut descriptors[i];
                    if existing.kind != kind {
                        return Err(SchemaError::ModalityConflict {
                            name: element.name.clone(),
                            first: existing.kind,
                            second: kind,
                        });
                    }
                    existing.email_shape |= email;
                }
                None => {
                    index.insert(element.name.clone(), descriptors.len());
                    descriptors.push(FieldDescriptor {
                        name: element.name.clone(),
                        kind,
                        meta_excluded: !meta_prefix.is_empty()
                            && element.name.starts_with(&meta_prefix),
                        email_shape: email,
                    });
                }
            }
        }

        tracing::debug!(fields = descriptors.len(), "schema classified");
        Ok(Self {
            descriptors,
            index,
            meta_prefix,
        })
    }

    /// Descriptor for a field name, if part of the schema.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Descriptors in schema order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.iter()
    }

    /// Number of logical fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The transport-reserved name prefix.
    #[must_use]
    pub fn meta_prefix(&self) -> &str {
        &self.meta_prefix
    }

    /// Resolve a field's current value through the store.
    ///
    /// The store may answer with a default-shaped value for names it has
    /// never seen; the result is normalized to the descriptor kind so callers
    /// always see a correctly shaped value.
    pub fn resolve(&self, store: &dyn FieldStore, name: &str) -> RegistryResult<FieldValue> {
        let desc = self
            .descriptor(name)
            .ok_or_else(|| RegistryError::UnknownField(name.to_string()))?;
        let value = store.resolve(name);
        if value.kind() == desc.kind {
            Ok(value)
        } else if value.is_empty() {
            Ok(FieldValue::empty_for(desc.kind))
        } else {
            Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected: desc.kind,
                got: value.kind(),
            })
        }
    }

    /// Write a field value through the store, validating name and shape.
    pub fn apply(
        &self,
        store: &mut dyn FieldStore,
        name: &str,
        value: FieldValue,
    ) -> RegistryResult<()> {
        let desc = self
            .descriptor(name)
            .ok_or_else(|| RegistryError::UnknownField(name.to_string()))?;
        if value.kind() != desc.kind {
            return Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected: desc.kind,
                got: value.kind(),
            });
        }
        store.apply(name, value);
        Ok(())
    }

    /// Reset a field to its empty value.
    pub fn clear(&self, store: &mut dyn FieldStore, name: &str) -> RegistryResult<()> {
        let desc = self
            .descriptor(name)
            .ok_or_else(|| RegistryError::UnknownField(name.to_string()))?;
        store.apply(name, FieldValue::empty_for(desc.kind));
        Ok(())
    }
}
