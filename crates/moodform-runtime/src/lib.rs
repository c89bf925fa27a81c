#![forbid(unsafe_code)]

//! Runtime: persistence scheduling, session lifecycle, and the submission
//! workflow around `moodform-core`.
//!
//! The centerpiece is [`engine::FormEngine`], which owns the data flow from
//! user edits through visibility, progress, debounced persistence, and the
//! submit/confirm state machine. Storage, notifications, and transport are
//! trait seams so the engine runs identically against a browser bridge, a
//! file, or test doubles.

pub mod engine;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod summary;
pub mod transport;
pub mod workflow;

pub use engine::{EngineConfig, FormEngine, SubmitOutcome};
pub use notify::{NotificationSink, RecordingNotifier, Severity, TracingNotifier};
pub use scheduler::{PersistenceScheduler, SchedulerConfig, WriteTrigger};
pub use session::{SessionContext, SessionKeys};
pub use storage::{FileStorage, MemoryStorage, StorageError, StorageResult, StorageSink};
pub use summary::{SummaryEntry, SummaryGroup, SummaryTaxonomy, SummaryTopic};
pub use transport::{RecordingTransport, TransportError, TransportSink};
pub use workflow::{
    AttemptOutcome, SubmissionState, SubmissionWorkflow, ValidationConfig, ValidationFailure,
    is_valid_email,
};
