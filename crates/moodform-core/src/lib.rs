#![forbid(unsafe_code)]

//! Core: field model, conditional visibility, snapshot codec, and progress.
//!
//! Pure data transforms with no I/O and no ambient clocks — every operation
//! takes what it needs explicitly. Orchestration (persistence scheduling,
//! session lifecycle, submission workflow) lives in `moodform-runtime`.

pub mod condition;
pub mod field;
pub mod progress;
pub mod registry;
pub mod snapshot;

pub use condition::{ConditionRule, ConditionSet, ConditionalBlock, VisibilitySet};
pub use field::{
    FieldDescriptor, FieldKind, FieldStore, FieldValue, InputElement, InputModality,
    MemoryFieldStore,
};
pub use progress::ProgressReport;
pub use registry::{FieldRegistry, RegistryError, RegistryResult, SchemaError};
pub use snapshot::{PersistedValue, RestoreReport, Snapshot, SnapshotError, SnapshotResult};
