#![forbid(unsafe_code)]

//! Session context: storage keys and the session clock.
//!
//! The session clock is set once per browsing session — on first load — or
//! restored from a prior snapshot's companion key, so elapsed duration
//! survives reloads. It is cleared together with the snapshot on confirmed
//! submission or explicit reset; ownership is explicit here rather than
//! ambient global state.

use crate::storage::{StorageResult, StorageSink};

/// Storage keys used by one form instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// Key holding the JSON-encoded snapshot.
    pub snapshot: String,
    /// Key holding the session start timestamp (decimal epoch millis).
    pub session_start: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            snapshot: "moodform.snapshot".to_string(),
            session_start: "moodform.session_start".to_string(),
        }
    }
}

/// Session lifecycle state: keys plus the start-of-session clock.
#[derive(Debug, Clone)]
pub struct SessionContext {
    keys: SessionKeys,
    start_ms: u64,
}

impl SessionContext {
    /// Initialize the session clock.
    ///
    /// Restores the start timestamp from storage when present and parseable;
    /// otherwise records `now_ms` and persists it. An unreadable or garbled
    /// stored value falls back to a fresh start rather than failing.
    pub fn init(storage: &mut dyn StorageSink, keys: SessionKeys, now_ms: u64) -> Self {
        let restored = match storage.get(&keys.session_start) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!(value = %raw, "stored session start unparseable, restarting clock");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "session start unreadable, restarting clock");
                None
            }
        };

        let start_ms = match restored {
            Some(ms) => ms,
            None => {
                if let Err(e) = storage.set(&keys.session_start, &now_ms.to_string()) {
                    tracing::warn!(error = %e, "could not persist session start");
                }
                now_ms
            }
        };

        tracing::debug!(start_ms, restored = restored.is_some(), "session clock ready");
        Self { keys, start_ms }
    }

    /// Session start, epoch milliseconds.
    #[must_use]
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Storage keys for this session.
    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Restart the clock in memory after persisted data was cleared.
    ///
    /// The new start is not persisted: the session-start key stays absent
    /// until the next session initializes it, but snapshots written for
    /// further edits carry the restart instant instead of a stale one.
    pub fn restart(&mut self, now_ms: u64) {
        self.start_ms = now_ms;
        tracing::debug!(start_ms = now_ms, "session clock restarted");
    }

    /// Elapsed session duration in whole minutes.
    #[must_use]
    pub fn elapsed_whole_minutes(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms) / 60_000
    }

    /// Remove the snapshot and the session clock together.
    ///
    /// Used on confirmed submission and explicit "clear all data".
    pub fn clear_all(&self, storage: &mut dyn StorageSink) -> StorageResult<()> {
        storage.remove(&self.keys.snapshot)?;
        storage.remove(&self.keys.session_start)?;
        tracing::debug!("persisted snapshot and session clock cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn fresh_session_records_and_persists_start() {
        let mut storage = MemoryStorage::new();
        let ctx = SessionContext::init(&mut storage, SessionKeys::default(), 5_000);
        assert_eq!(ctx.start_ms(), 5_000);
        assert_eq!(
            storage.get("moodform.session_start").unwrap().as_deref(),
            Some("5000")
        );
    }

    #[test]
    fn reload_restores_the_prior_start() {
        let mut storage =
            MemoryStorage::with_entries([("moodform.session_start", "1000")]);
        let ctx = SessionContext::init(&mut storage, SessionKeys::default(), 9_999);
        assert_eq!(ctx.start_ms(), 1_000);
    }

    #[test]
    fn garbled_start_restarts_the_clock() {
        let mut storage =
            MemoryStorage::with_entries([("moodform.session_start", "yesterday")]);
        let ctx = SessionContext::init(&mut storage, SessionKeys::default(), 7_000);
        assert_eq!(ctx.start_ms(), 7_000);
    }

    #[test]
    fn elapsed_rounds_down_to_whole_minutes() {
        let mut storage = MemoryStorage::new();
        let ctx = SessionContext::init(&mut storage, SessionKeys::default(), 0);
        assert_eq!(ctx.elapsed_whole_minutes(59_999), 0);
        assert_eq!(ctx.elapsed_whole_minutes(60_000), 1);
        assert_eq!(ctx.elapsed_whole_minutes(330_000), 5);
    }

    #[test]
    fn restart_moves_the_clock_without_persisting() {
        let mut storage = MemoryStorage::new();
        let mut ctx = SessionContext::init(&mut storage, SessionKeys::default(), 1_000);
        ctx.clear_all(&mut storage).unwrap();
        ctx.restart(120_000);
        assert_eq!(ctx.start_ms(), 120_000);
        assert_eq!(ctx.elapsed_whole_minutes(180_000), 1);
        assert!(storage.get("moodform.session_start").unwrap().is_none());
    }

    #[test]
    fn clear_all_removes_both_keys() {
        let mut storage = MemoryStorage::with_entries([
            ("moodform.snapshot", "{}"),
            ("moodform.session_start", "1"),
        ]);
        let ctx = SessionContext::init(&mut storage, SessionKeys::default(), 2);
        ctx.clear_all(&mut storage).unwrap();
        assert!(storage.is_empty());
    }
}
