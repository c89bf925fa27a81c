#![forbid(unsafe_code)]

//! The form engine: one object owning the full session data flow.
//!
//! ```text
//! edit -> registry.apply -> visibility recompute -> clear-on-hide
//!      -> scheduler.mark_dirty -> progress recompute
//!
//! timer -> scheduler.poll -> persist_now -> storage.set
//!
//! load -> snapshot restore -> visibility recompute -> clear-on-hide
//!      -> progress (never dirty)
//!
//! submit -> workflow validate -> duration stamp -> summary
//! confirm -> transport deliver -> clear snapshot + session clock
//! ```
//!
//! Everything runs on the host's single event loop; storage reads and writes
//! are synchronous, so triggers are serialized by construction and the
//! persisted snapshot has no concurrent writers.

use std::collections::BTreeMap;

use moodform_core::condition::{ConditionRule, ConditionSet, ConditionalBlock, VisibilitySet};
use moodform_core::field::{FieldStore, FieldValue, InputElement};
use moodform_core::progress::{self, ProgressReport};
use moodform_core::registry::{FieldRegistry, RegistryResult, SchemaError};
use moodform_core::snapshot::{self, Snapshot};

use crate::notify::{NotificationSink, Severity};
use crate::scheduler::{PersistenceScheduler, SchedulerConfig, WriteTrigger};
use crate::session::{SessionContext, SessionKeys};
use crate::storage::StorageSink;
use crate::summary::{self, SummaryGroup, SummaryTaxonomy};
use crate::transport::TransportSink;
use crate::workflow::{SubmissionState, SubmissionWorkflow, ValidationConfig, ValidationFailure};

/// Everything the engine needs to know about one form.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Named input elements from the schema source.
    pub elements: Vec<InputElement>,
    /// Conditional block membership.
    pub blocks: Vec<ConditionalBlock>,
    /// Visibility rules.
    pub rules: Vec<ConditionRule>,
    /// Fixed summary topic taxonomy.
    pub taxonomy: SummaryTaxonomy,
    /// Validation settings.
    pub validation: ValidationConfig,
    /// Persistence timing.
    pub scheduler: SchedulerConfig,
    /// Storage keys.
    pub keys: SessionKeys,
    /// Transport-reserved name prefix. Default: `_mf_`.
    pub meta_prefix: String,
}

impl EngineConfig {
    /// Config with defaults for everything but the schema.
    #[must_use]
    pub fn new(elements: Vec<InputElement>) -> Self {
        Self {
            elements,
            blocks: Vec::new(),
            rules: Vec::new(),
            taxonomy: SummaryTaxonomy::default(),
            validation: ValidationConfig::default(),
            scheduler: SchedulerConfig::default(),
            keys: SessionKeys::default(),
            meta_prefix: "_mf_".to_string(),
        }
    }
}

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation blocked the attempt; the workflow is back in `Draft`.
    Rejected(Vec<ValidationFailure>),
    /// Validation passed; the grouped summary awaits confirmation.
    AwaitingConfirmation(Vec<SummaryGroup>),
}

/// The session-state engine for one form instance.
pub struct FormEngine<FS, SS, NS>
where
    FS: FieldStore,
    SS: StorageSink,
    NS: NotificationSink,
{
    registry: FieldRegistry,
    conditions: ConditionSet,
    taxonomy: SummaryTaxonomy,
    store: FS,
    storage: SS,
    notifier: NS,
    session: SessionContext,
    scheduler: PersistenceScheduler,
    workflow: SubmissionWorkflow,
    visibility: VisibilitySet,
    progress: ProgressReport,
}

impl<FS, SS, NS> FormEngine<FS, SS, NS>
where
    FS: FieldStore,
    SS: StorageSink,
    NS: NotificationSink,
{
    /// Build the engine: classify the schema, start the session clock,
    /// restore any persisted snapshot, and derive initial visibility and
    /// progress.
    ///
    /// A corrupt snapshot is logged, surfaced as a warning notification, and
    /// treated as absent; only a malformed schema fails construction.
    pub fn new(
        config: EngineConfig,
        store: FS,
        mut storage: SS,
        notifier: NS,
        now_ms: u64,
    ) -> Result<Self, SchemaError> {
        let registry = FieldRegistry::classify(&config.elements, config.meta_prefix)?;
        let conditions = ConditionSet::new(config.blocks, config.rules);
        let session = SessionContext::init(&mut storage, config.keys, now_ms);

        let mut engine = Self {
            registry,
            conditions,
            taxonomy: config.taxonomy,
            store,
            storage,
            notifier,
            session,
            scheduler: PersistenceScheduler::new(config.scheduler, now_ms),
            workflow: SubmissionWorkflow::new(config.validation),
            visibility: VisibilitySet::default(),
            progress: ProgressReport::default(),
        };

        engine.restore_snapshot();

        // Derive visibility from restored values; clear anything a prior
        // schema or rule change left stranded in a now-hidden block. The
        // baseline treats every block as visible so stale values are swept.
        let baseline = VisibilitySet::default();
        engine.visibility = engine.conditions.recompute_all(&engine.registry, &engine.store);
        engine.conditions.clear_hidden_transitions(
            &baseline,
            &engine.visibility,
            &engine.registry,
            &mut engine.store,
        );
        engine.progress = progress::compute(
            &engine.registry,
            &engine.store,
            &engine.conditions,
            &engine.visibility,
        );
        Ok(engine)
    }

    fn restore_snapshot(&mut self) {
        let raw = match self.storage.get(&self.session.keys().snapshot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot unreadable, starting fresh");
                self.notifier
                    .notify("Saved answers could not be read.", Severity::Warning);
                return;
            }
        };
        match Snapshot::from_json(&raw) {
            Ok(snap) => {
                let report = snapshot::restore(&snap, &self.registry, &mut self.store);
                if report.applied > 0 {
                    self.notifier
                        .notify("Your earlier answers were restored.", Severity::Info);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "corrupt snapshot, starting fresh");
                self.notifier.notify(
                    "Saved answers were unreadable and have been discarded.",
                    Severity::Warning,
                );
            }
        }
    }

    /// Apply a user edit.
    ///
    /// Recomputes visibility (clearing fields of any block that just hid),
    /// marks the session dirty, and returns the updated progress.
    pub fn input(
        &mut self,
        name: &str,
        value: FieldValue,
        now_ms: u64,
    ) -> RegistryResult<ProgressReport> {
        self.registry.apply(&mut self.store, name, value)?;

        let next = self.conditions.recompute_all(&self.registry, &self.store);
        self.conditions.clear_hidden_transitions(
            &self.visibility,
            &next,
            &self.registry,
            &mut self.store,
        );
        self.visibility = next;

        self.scheduler.mark_dirty(now_ms);
        self.progress =
            progress::compute(&self.registry, &self.store, &self.conditions, &self.visibility);
        Ok(self.progress)
    }

    /// Drive the persistence timers. Call whenever a host timer fires.
    ///
    /// Returns the trigger when a write was attempted this turn.
    pub fn poll(&mut self, now_ms: u64) -> Option<WriteTrigger> {
        let trigger = self.scheduler.poll(now_ms)?;
        self.persist_now(now_ms, trigger);
        Some(trigger)
    }

    /// Session-end signal: synchronous final write if dirty.
    pub fn teardown(&mut self, now_ms: u64) {
        if let Some(trigger) = self.scheduler.teardown() {
            self.persist_now(now_ms, trigger);
        }
    }

    fn persist_now(&mut self, now_ms: u64, trigger: WriteTrigger) {
        let snap = snapshot::encode(
            &self.registry,
            &self.store,
            self.session.start_ms(),
            now_ms,
        );
        match self.storage.set(&self.session.keys().snapshot, &snap.to_json()) {
            Ok(()) => {
                self.scheduler.note_write_success();
                tracing::debug!(%trigger, fields = snap.fields.len(), "snapshot persisted");
            }
            Err(e) => {
                self.scheduler.note_write_failure();
                tracing::warn!(%trigger, error = %e, "snapshot write failed");
                self.notifier.notify(
                    "Your answers could not be saved; saving will be retried.",
                    Severity::Danger,
                );
            }
        }
    }

    /// The user's submit action.
    ///
    /// Suppressing the host's default submission is the caller's job; this
    /// runs validation and either surfaces the failures or produces the
    /// grouped summary for confirmation.
    pub fn submit_requested(&mut self, now_ms: u64) -> SubmitOutcome {
        let elapsed = self.session.elapsed_whole_minutes(now_ms);
        match self.workflow.submit_requested(
            &self.registry,
            &mut self.store,
            &self.conditions,
            &self.visibility,
            elapsed,
        ) {
            Ok(()) => {
                let groups = summary::build(
                    &self.taxonomy,
                    &self.registry,
                    &self.store,
                    &self.conditions,
                    &self.visibility,
                );
                SubmitOutcome::AwaitingConfirmation(groups)
            }
            Err(failures) => {
                for failure in &failures {
                    self.notifier.notify(&failure.to_string(), Severity::Warning);
                }
                SubmitOutcome::Rejected(failures)
            }
        }
    }

    /// Confirm the summary: deliver the record, then clear the persisted
    /// snapshot and session clock unconditionally.
    ///
    /// Returns `false` when no attempt is awaiting confirmation. A transport
    /// failure is surfaced via the notification sink; the local data is
    /// cleared either way, and the in-memory session clock restarts at
    /// `now_ms` so any further edits persist with a fresh start.
    pub fn confirm(&mut self, transport: &mut dyn TransportSink, now_ms: u64) -> bool {
        if !self.workflow.confirm() {
            return false;
        }
        let record = self.submission_record();
        if let Err(e) = transport.deliver(&record) {
            tracing::warn!(error = %e, "submission delivery failed");
            self.notifier
                .notify("Your submission could not be delivered.", Severity::Danger);
        }
        if let Err(e) = self.session.clear_all(&mut self.storage) {
            tracing::warn!(error = %e, "persisted data not fully cleared");
        }
        self.session.restart(now_ms);
        self.scheduler.note_write_success();
        true
    }

    /// Cancel the confirmation summary; editing resumes, nothing discarded.
    pub fn cancel(&mut self) -> bool {
        self.workflow.cancel()
    }

    /// Backdrop dismiss: same as cancel.
    pub fn dismiss(&mut self) -> bool {
        self.workflow.backdrop_dismiss()
    }

    /// Explicit "clear all data": empty every field, drop the persisted
    /// snapshot and session clock, restart the in-memory clock at `now_ms`,
    /// and recompute visibility and progress.
    pub fn clear_all_data(&mut self, now_ms: u64) {
        let names: Vec<String> = self.registry.descriptors().map(|d| d.name.clone()).collect();
        for name in names {
            // Names come from the registry itself; clear cannot fail here.
            let _ = self.registry.clear(&mut self.store, &name);
        }
        if let Err(e) = self.session.clear_all(&mut self.storage) {
            tracing::warn!(error = %e, "persisted data not fully cleared");
        }
        self.session.restart(now_ms);
        self.scheduler.note_write_success();
        self.visibility = self.conditions.recompute_all(&self.registry, &self.store);
        self.progress =
            progress::compute(&self.registry, &self.store, &self.conditions, &self.visibility);
    }

    /// The record handed to the transport: every non-empty visible field
    /// plus non-empty transport-reserved fields, rendered as strings.
    #[must_use]
    pub fn submission_record(&self) -> BTreeMap<String, String> {
        let mut record = BTreeMap::new();
        for desc in self.registry.descriptors() {
            if !desc.meta_excluded
                && !self.conditions.field_visible(&self.visibility, &desc.name)
            {
                continue;
            }
            if let Ok(value) = self.registry.resolve(&self.store, &desc.name) {
                if !value.is_empty() {
                    record.insert(desc.name.clone(), value.render());
                }
            }
        }
        record
    }

    // -- accessors ---------------------------------------------------------

    /// Latest computed progress.
    #[must_use]
    pub fn progress(&self) -> ProgressReport {
        self.progress
    }

    /// Latest computed visibility.
    #[must_use]
    pub fn visibility(&self) -> &VisibilitySet {
        &self.visibility
    }

    /// Current workflow state.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.workflow.state()
    }

    /// Whether unsaved changes exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_dirty()
    }

    /// Earliest instant a persistence timer could fire, for host scheduling.
    #[must_use]
    pub fn next_wake(&self) -> Option<u64> {
        self.scheduler.next_wake()
    }

    /// The classified schema.
    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// The field store (read access; mutations go through [`input`](Self::input)).
    #[must_use]
    pub fn field_store(&self) -> &FS {
        &self.store
    }

    /// The storage sink.
    #[must_use]
    pub fn storage(&self) -> &SS {
        &self.storage
    }

    /// The notification sink.
    #[must_use]
    pub fn notifier(&self) -> &NS {
        &self.notifier
    }
}
