#![forbid(unsafe_code)]

//! Field model: input elements, descriptors, values, and the store seam.
//!
//! A form schema arrives as a flat list of named [`InputElement`]s. Several
//! elements may share a name (radio and checkbox groups); the registry
//! collapses them into one logical field each. The engine never inspects
//! presentation details — it reasons only about [`FieldKind`].
//!
//! # Invariants
//!
//! 1. A `SingleChoiceGroup` holds at most one selected value. The exclusive
//!    selection is enforced by the rendering surface; this module models it
//!    as `Option<String>` and never assumes more.
//! 2. `FieldValue::is_empty` is the single definition of "unfilled" used by
//!    progress, validation, and the snapshot codec.
//! 3. Multi-choice selection order is irrelevant; values are kept in a
//!    `BTreeSet` so encoding is deterministic.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;

/// Presentation-free classification of a single named input element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputModality {
    /// Free text entry (also covers textarea-like inputs).
    Text,
    /// Text entry that must carry an email shape at submission time.
    Email,
    /// Exclusive selection: one choice among the elements sharing a name.
    Radio,
    /// Multiple selection: any subset of the elements sharing a name.
    Checkbox,
}

impl InputModality {
    /// The field kind a group of elements with this modality collapses to.
    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            InputModality::Text | InputModality::Email => FieldKind::Single,
            InputModality::Radio => FieldKind::SingleChoiceGroup,
            InputModality::Checkbox => FieldKind::MultiChoiceGroup,
        }
    }
}

impl fmt::Display for InputModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputModality::Text => "text",
            InputModality::Email => "email",
            InputModality::Radio => "radio",
            InputModality::Checkbox => "checkbox",
        };
        f.write_str(s)
    }
}

/// One named input element as declared by the schema source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    /// Logical field name. Shared across group members.
    pub name: String,
    /// Input modality of this element.
    pub modality: InputModality,
}

impl InputElement {
    /// Convenience constructor.
    #[must_use]
    pub fn new(name: impl Into<String>, modality: InputModality) -> Self {
        Self {
            name: name.into(),
            modality,
        }
    }
}

/// Logical kind of a deduplicated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// One value-bearing element (text, email, date, ...).
    Single,
    /// Radio-like group: at most one selection across members.
    SingleChoiceGroup,
    /// Checkbox-like group: any subset of members selected.
    MultiChoiceGroup,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Single => "single",
            FieldKind::SingleChoiceGroup => "single-choice group",
            FieldKind::MultiChoiceGroup => "multi-choice group",
        };
        f.write_str(s)
    }
}

/// One logical field after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Logical field name (unique within a registry).
    pub name: String,
    /// Collapsed kind of the element group.
    pub kind: FieldKind,
    /// Name carries the transport-reserved prefix: excluded from progress
    /// counts and never persisted in snapshots.
    pub meta_excluded: bool,
    /// Value must match an email shape when non-empty at submission time.
    pub email_shape: bool,
}

/// Current value of a logical field.
///
/// The variant must match the descriptor kind; the registry enforces this at
/// the apply seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Scalar value of a `Single` field.
    Text(String),
    /// Selection of a `SingleChoiceGroup`; `None` when nothing is selected.
    Choice(Option<String>),
    /// Selections of a `MultiChoiceGroup`.
    Selections(BTreeSet<String>),
}

impl FieldValue {
    /// The empty/unselected value for a field kind.
    #[must_use]
    pub fn empty_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Single => FieldValue::Text(String::new()),
            FieldKind::SingleChoiceGroup => FieldValue::Choice(None),
            FieldKind::MultiChoiceGroup => FieldValue::Selections(BTreeSet::new()),
        }
    }

    /// Build a multi-choice value from an iterator of selections.
    #[must_use]
    pub fn selections<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Selections(items.into_iter().map(Into::into).collect())
    }

    /// The kind this value is shaped for.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Single,
            FieldValue::Choice(_) => FieldKind::SingleChoiceGroup,
            FieldValue::Selections(_) => FieldKind::MultiChoiceGroup,
        }
    }

    /// Whether the value counts as unfilled.
    ///
    /// Text is empty when blank after trimming surrounding whitespace; a
    /// choice is empty when no selection exists; a selection set is empty
    /// when no member is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Choice(c) => c.is_none(),
            FieldValue::Selections(s) => s.is_empty(),
        }
    }

    /// Render the value for summaries and transport records.
    ///
    /// Multi-choice selections join with `", "` in set order. Empty values
    /// render as the empty string.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Choice(Some(v)) => v.clone(),
            FieldValue::Choice(None) => String::new(),
            FieldValue::Selections(s) => {
                let parts: Vec<&str> = s.iter().map(String::as_str).collect();
                parts.join(", ")
            }
        }
    }
}

/// Seam between the engine and whatever actually holds field values.
///
/// In a browser this is backed by the live document; in tests and headless
/// use it is a [`MemoryFieldStore`]. The engine only ever reads and writes
/// through this trait, never through presentation details.
///
/// # Contract
///
/// - `resolve` for an unknown name returns the empty `Single` value; the
///   registry shields callers from that case by validating names first.
/// - `apply` replaces the whole value. Implementations must not merge.
pub trait FieldStore {
    /// Current value of the named field.
    fn resolve(&self, name: &str) -> FieldValue;

    /// Replace the named field's value.
    fn apply(&mut self, name: &str, value: FieldValue);
}

/// HashMap-backed field store for headless operation and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFieldStore {
    values: HashMap<String, FieldValue>,
}

impl MemoryFieldStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields holding an explicit value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field holds an explicit value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FieldStore for MemoryFieldStore {
    fn resolve(&self, name: &str) -> FieldValue {
        self.values
            .get(name)
            .cloned()
            .unwrap_or_else(|| FieldValue::Text(String::new()))
    }

    fn apply(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }
}
