#![forbid(unsafe_code)]

//! MoodForm public facade crate.
//!
//! Re-exports the common types from the core and runtime crates and offers a
//! lightweight prelude for day-to-day usage.

// --- Core re-exports -------------------------------------------------------

pub use moodform_core::condition::{ConditionRule, ConditionSet, ConditionalBlock, VisibilitySet};
pub use moodform_core::field::{
    FieldDescriptor, FieldKind, FieldStore, FieldValue, InputElement, InputModality,
    MemoryFieldStore,
};
pub use moodform_core::progress::ProgressReport;
pub use moodform_core::registry::{FieldRegistry, RegistryError, SchemaError};
pub use moodform_core::snapshot::{PersistedValue, RestoreReport, Snapshot, SnapshotError};

// --- Runtime re-exports ----------------------------------------------------

pub use moodform_runtime::engine::{EngineConfig, FormEngine, SubmitOutcome};
pub use moodform_runtime::notify::{NotificationSink, Severity, TracingNotifier};
pub use moodform_runtime::scheduler::{SchedulerConfig, WriteTrigger};
pub use moodform_runtime::session::{SessionContext, SessionKeys};
pub use moodform_runtime::storage::{FileStorage, MemoryStorage, StorageError, StorageSink};
pub use moodform_runtime::summary::{SummaryGroup, SummaryTaxonomy, SummaryTopic};
pub use moodform_runtime::transport::{TransportError, TransportSink};
pub use moodform_runtime::workflow::{
    SubmissionState, ValidationConfig, ValidationFailure,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ConditionRule, ConditionalBlock, EngineConfig, FieldValue, FormEngine, InputElement,
        InputModality, MemoryFieldStore, MemoryStorage, ProgressReport, SchedulerConfig,
        SubmissionState, SubmitOutcome, SummaryTaxonomy, SummaryTopic, TracingNotifier,
        ValidationConfig,
    };

    pub use crate::{core, runtime};
}

pub use moodform_core as core;
pub use moodform_runtime as runtime;
