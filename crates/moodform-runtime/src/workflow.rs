#![forbid(unsafe_code)]

//! Submission workflow state machine.
//!
//! ```text
//! Draft --submit_requested--> Validating
//! Validating --failure--> Draft            (errors surfaced, nothing advances)
//! Validating --success--> AwaitingConfirmation
//! AwaitingConfirmation --confirm--> Confirmed   (terminal for the attempt)
//! AwaitingConfirmation --cancel/dismiss--> Draft (attempt recorded Cancelled)
//! ```
//!
//! Validation runs two checks against currently-visible fields only:
//!
//! 1. Every visible, non-empty email-shaped field must match
//!    `local@domain.tld` — failures are per-field errors.
//! 2. At least `min_signal_count` of the fixed emotional-signal fields must
//!    be non-empty — a blocking warning distinct from field errors.
//!
//! On success the elapsed session duration in whole minutes is written into
//! the dedicated duration field (a transport-reserved name, recomputed each
//! attempt, never restored from snapshots).
//!
//! `Confirmed` and `Cancelled` are terminal per attempt; cancel and dismiss
//! return the editing state to `Draft` with every value intact, and a fresh
//! `submit_requested` starts a new attempt.

use std::fmt;

use moodform_core::condition::{ConditionSet, VisibilitySet};
use moodform_core::field::{FieldStore, FieldValue};
use moodform_core::registry::FieldRegistry;

/// Workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Editing; no submit attempt in flight.
    Draft,
    /// Checks running (transient within a submit call).
    Validating,
    /// Summary shown, waiting for confirm/cancel.
    AwaitingConfirmation,
    /// Attempt confirmed and handed to transport.
    Confirmed,
    /// Attempt abandoned via cancel or backdrop dismiss. The live state
    /// returns to `Draft` so editing resumes immediately; the abandoned
    /// attempt is recorded through
    /// [`last_outcome`](SubmissionWorkflow::last_outcome).
    Cancelled,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionState::Draft => "draft",
            SubmissionState::Validating => "validating",
            SubmissionState::AwaitingConfirmation => "awaiting-confirmation",
            SubmissionState::Confirmed => "confirmed",
            SubmissionState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why validation blocked the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// An email-shaped field holds a value that is not `local@domain.tld`.
    InvalidEmail {
        /// The offending field; the host sets its error state.
        field: String,
    },
    /// Fewer emotional-signal fields filled than required.
    InsufficientSignals {
        /// Non-empty signal fields found.
        filled: usize,
        /// Minimum required.
        required: usize,
    },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::InvalidEmail { field } => {
                write!(f, "field `{field}` is not a valid email address")
            }
            ValidationFailure::InsufficientSignals { filled, required } => write!(
                f,
                "only {filled} of at least {required} emotional fields are filled"
            ),
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// The fixed set of fields gating meaningful content.
    pub emotional_signal_fields: Vec<String>,
    /// Minimum non-empty signal fields. Default: 2.
    pub min_signal_count: usize,
    /// Transport-reserved field stamped with elapsed whole minutes.
    pub duration_field: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            emotional_signal_fields: Vec::new(),
            min_signal_count: 2,
            duration_field: "_mf_duration_minutes".to_string(),
        }
    }
}

/// Terminal outcome of the previous attempt, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt was confirmed and delivered.
    Confirmed,
    /// The attempt was cancelled or dismissed.
    Cancelled,
}

/// The submission state machine.
#[derive(Debug, Clone)]
pub struct SubmissionWorkflow {
    state: SubmissionState,
    config: ValidationConfig,
    last_outcome: Option<AttemptOutcome>,
}

impl SubmissionWorkflow {
    /// Start in `Draft`.
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            state: SubmissionState::Draft,
            config,
            last_outcome: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Terminal outcome of the most recently finished attempt.
    #[must_use]
    pub fn last_outcome(&self) -> Option<AttemptOutcome> {
        self.last_outcome
    }

    /// The user's submit action. Only meaningful in `Draft`.
    ///
    /// Runs validation over visible fields; on success stamps the duration
    /// field and advances to `AwaitingConfirmation`, otherwise stays in
    /// `Draft` and returns every failure found.
    pub fn submit_requested(
        &mut self,
        registry: &FieldRegistry,
        store: &mut dyn FieldStore,
        conditions: &ConditionSet,
        vis: &VisibilitySet,
        elapsed_minutes: u64,
    ) -> Result<(), Vec<ValidationFailure>> {
        if self.state != SubmissionState::Draft {
            tracing::debug!(state = %self.state, "submit ignored outside draft");
            return Err(Vec::new());
        }
        self.state = SubmissionState::Validating;

        let failures = self.validate(registry, store, conditions, vis);
        if !failures.is_empty() {
            tracing::debug!(failures = failures.len(), "validation blocked submission");
            self.state = SubmissionState::Draft;
            return Err(failures);
        }

        if let Err(e) = registry.apply(
            store,
            &self.config.duration_field,
            FieldValue::Text(elapsed_minutes.to_string()),
        ) {
            // The duration field is part of the declared schema; a miss here
            // is a configuration bug, not a user error.
            tracing::warn!(field = %self.config.duration_field, error = %e,
                "duration field not stamped");
        }

        self.state = SubmissionState::AwaitingConfirmation;
        Ok(())
    }

    /// Confirm the summary. `AwaitingConfirmation -> Confirmed`.
    pub fn confirm(&mut self) -> bool {
        if self.state != SubmissionState::AwaitingConfirmation {
            return false;
        }
        self.state = SubmissionState::Confirmed;
        self.last_outcome = Some(AttemptOutcome::Confirmed);
        true
    }

    /// Cancel the summary; editing resumes with values intact.
    pub fn cancel(&mut self) -> bool {
        if self.state != SubmissionState::AwaitingConfirmation {
            return false;
        }
        self.state = SubmissionState::Draft;
        self.last_outcome = Some(AttemptOutcome::Cancelled);
        true
    }

    /// Backdrop dismiss: same transition as cancel.
    pub fn backdrop_dismiss(&mut self) -> bool {
        self.cancel()
    }

    fn validate(
        &self,
        registry: &FieldRegistry,
        store: &dyn FieldStore,
        conditions: &ConditionSet,
        vis: &VisibilitySet,
    ) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for desc in registry.descriptors() {
            if !desc.email_shape || !conditions.field_visible(vis, &desc.name) {
                continue;
            }
            match registry.resolve(store, &desc.name) {
                Ok(v) if !v.is_empty() => {
                    if !is_valid_email(v.render().as_str()) {
                        failures.push(ValidationFailure::InvalidEmail {
                            field: desc.name.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        let filled = self
            .config
            .emotional_signal_fields
            .iter()
            .filter(|name| {
                conditions.field_visible(vis, name)
                    && registry
                        .resolve(store, name)
                        .map(|v| !v.is_empty())
                        .unwrap_or(false)
            })
            .count();
        if filled < self.config.min_signal_count {
            failures.push(ValidationFailure::InsufficientSignals {
                filled,
                required: self.config.min_signal_count,
            });
        }

        failures
    }
}

/// Check the `local@domain.tld` shape.
///
/// Exactly one `@`, a non-empty local part, no whitespace anywhere, and a
/// domain of dot-separated non-empty labels whose last label is at least two
/// characters.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    labels.last().is_some_and(|tld| tld.len() >= 2)
}
