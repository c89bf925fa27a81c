#![forbid(unsafe_code)]

//! Persistence scheduler: decides *when* a snapshot write happens.
//!
//! Three independent triggers funnel into the engine's single `persist_now`
//! operation:
//!
//! - **Debounce**: each field edit (re)arms a deadline one quiet period after
//!   the most recent edit — pure debounce, so only the final edit of a burst
//!   produces a write.
//! - **Interval**: a fixed-period safety net that writes only when dirty. The
//!   boundary advances whether or not a write happens, so a debounce write
//!   just before the boundary suppresses the interval write instead of
//!   deferring it.
//! - **Teardown**: on the session-end signal the caller writes synchronously
//!   if dirty, before control returns.
//!
//! The scheduler owns the dirty flag exclusively. It never touches storage
//! itself; the caller performs the write and reports the outcome back via
//! [`note_write_success`](PersistenceScheduler::note_write_success) /
//! [`note_write_failure`](PersistenceScheduler::note_write_failure). A failed
//! write leaves the flag set so a later trigger retries.
//!
//! Time is threaded through every call as epoch milliseconds: the host event
//! loop calls [`poll`](PersistenceScheduler::poll) whenever a timer fires,
//! and the scheduler stays deterministic and directly testable.
//!
//! # Invariants
//!
//! 1. Arming a new debounce deadline supersedes any not-yet-fired one.
//! 2. At most one trigger fires per `poll` call.
//! 3. A clean scheduler never asks for a write.

use std::fmt;

/// Quiet period and safety-net interval, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Debounce quiet period after the last qualifying edit.
    /// Default: 500 ms.
    pub debounce_ms: u64,
    /// Safety-net write period, applied only while dirty.
    /// Default: 30 000 ms.
    pub interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            interval_ms: 30_000,
        }
    }
}

/// Which trigger asked for the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTrigger {
    /// The debounce quiet period elapsed.
    Debounce,
    /// The interval boundary passed while dirty.
    Interval,
    /// Session teardown with unsaved changes.
    Teardown,
}

impl fmt::Display for WriteTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteTrigger::Debounce => "debounce",
            WriteTrigger::Interval => "interval",
            WriteTrigger::Teardown => "teardown",
        };
        f.write_str(s)
    }
}

/// Debounce + interval + teardown write orchestration.
#[derive(Debug, Clone)]
pub struct PersistenceScheduler {
    config: SchedulerConfig,
    dirty: bool,
    debounce_deadline: Option<u64>,
    next_interval_at: u64,
    torn_down: bool,
}

impl PersistenceScheduler {
    /// Create a scheduler; the interval clock starts at `now_ms`.
    #[must_use]
    pub fn new(config: SchedulerConfig, now_ms: u64) -> Self {
        Self {
            config,
            dirty: false,
            debounce_deadline: None,
            next_interval_at: now_ms.saturating_add(config.interval_ms),
            torn_down: false,
        }
    }

    /// Whether state has changed since the last successful write.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a field mutation: sets dirty and (re)arms the debounce.
    pub fn mark_dirty(&mut self, now_ms: u64) {
        self.dirty = true;
        self.debounce_deadline = Some(now_ms.saturating_add(self.config.debounce_ms));
    }

    /// Check timers. Returns the trigger if a write is due now.
    ///
    /// Call whenever a host timer fires (or once per loop turn); between the
    /// returned trigger and the outcome report no other trigger can fire,
    /// since execution is single-threaded.
    pub fn poll(&mut self, now_ms: u64) -> Option<WriteTrigger> {
        if self.torn_down {
            return None;
        }
        // Advance the interval boundary first so a debounce write landing in
        // the same turn consumes it rather than leaving it pending.
        let mut interval_due = false;
        while now_ms >= self.next_interval_at {
            interval_due = true;
            self.next_interval_at = self.next_interval_at.saturating_add(self.config.interval_ms);
        }

        if let Some(deadline) = self.debounce_deadline {
            if now_ms >= deadline {
                self.debounce_deadline = None;
                return Some(WriteTrigger::Debounce);
            }
        }

        if interval_due && self.dirty {
            return Some(WriteTrigger::Interval);
        }
        None
    }

    /// Session-end signal. Returns the teardown trigger if a synchronous
    /// final write is required; the debounce and interval timers are
    /// cancelled either way.
    pub fn teardown(&mut self) -> Option<WriteTrigger> {
        self.debounce_deadline = None;
        self.torn_down = true;
        if self.dirty {
            Some(WriteTrigger::Teardown)
        } else {
            None
        }
    }

    /// The earliest instant at which `poll` could fire, for host timers.
    #[must_use]
    pub fn next_wake(&self) -> Option<u64> {
        if self.torn_down {
            return None;
        }
        match self.debounce_deadline {
            Some(d) if self.dirty => Some(d.min(self.next_interval_at)),
            Some(d) => Some(d),
            None if self.dirty => Some(self.next_interval_at),
            None => None,
        }
    }

    /// The write for the last returned trigger completed; state is durable.
    pub fn note_write_success(&mut self) {
        self.dirty = false;
        self.debounce_deadline = None;
    }

    /// The write failed; stay dirty so a later trigger retries.
    pub fn note_write_failure(&mut self) {
        tracing::warn!("persistence write failed, keeping dirty flag for retry");
    }
}
