#![forbid(unsafe_code)]

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// One live install session.
///
/// `finished` flips only after the worker has published its terminal
/// event and released the slot, so a waiter never observes a free slot
/// before the outcome is on the bus.
struct ActiveSession {
    cancel: CancellationToken,
    finished: CancellationToken,
}

/// Registry of live sessions, at most one per project id.
#[derive(Clone, Default)]
pub(crate) struct Sessions {
    inner: Arc<Mutex<HashMap<String, ActiveSession>>>,
}

impl Sessions {
    /// Claim the slot for `project_id`.
    ///
    /// Returns `(cancel, finished)` tokens for the new session, or
    /// `None` when a session already holds the slot. The cancel token
    /// is a child of `shutdown`, so engine-wide shutdown reaches every
    /// worker.
    pub(crate) fn try_begin(
        &self,
        project_id: &str,
        shutdown: &CancellationToken,
    ) -> Option<(CancellationToken, CancellationToken)> {
        let mut inner = self.inner.lock();
        if inner.contains_key(project_id) {
            return None;
        }
        let cancel = shutdown.child_token();
        let finished = CancellationToken::new();
        inner.insert(
            project_id.to_string(),
            ActiveSession {
                cancel: cancel.clone(),
                finished: finished.clone(),
            },
        );
        Some((cancel, finished))
    }

    /// Release the slot and wake waiters. The terminal event must
    /// already be on the bus when this is called.
    pub(crate) fn finish(&self, project_id: &str) {
        let session = self.inner.lock().remove(project_id);
        if let Some(session) = session {
            session.finished.cancel();
        }
    }

    /// Flag the live session for cancellation. Returns whether one was
    /// there to flag.
    pub(crate) fn cancel(&self, project_id: &str) -> bool {
        match self.inner.lock().get(project_id) {
            Some(session) => {
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Latch resolving when the live session fully winds down.
    pub(crate) fn finished_token(&self, project_id: &str) -> Option<CancellationToken> {
        self.inner
            .lock()
            .get(project_id)
            .map(|s| s.finished.clone())
    }

    pub(crate) fn is_active(&self, project_id: &str) -> bool {
        self.inner.lock().contains_key(project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_exclusive_per_id() {
        let sessions = Sessions::default();
        let shutdown = CancellationToken::new();

        assert!(sessions.try_begin("demo", &shutdown).is_some());
        assert!(sessions.try_begin("demo", &shutdown).is_none());
        assert!(sessions.try_begin("other", &shutdown).is_some());
    }

    #[test]
    fn finish_releases_the_slot_and_flips_the_latch() {
        let sessions = Sessions::default();
        let shutdown = CancellationToken::new();
        let (_, finished) = sessions.try_begin("demo", &shutdown).unwrap();

        assert!(sessions.is_active("demo"));
        sessions.finish("demo");

        assert!(finished.is_cancelled());
        assert!(!sessions.is_active("demo"));
        assert!(sessions.try_begin("demo", &shutdown).is_some());
    }

    #[test]
    fn cancel_flags_only_live_sessions() {
        let sessions = Sessions::default();
        let shutdown = CancellationToken::new();
        let (cancel, _) = sessions.try_begin("demo", &shutdown).unwrap();

        assert!(sessions.cancel("demo"));
        assert!(cancel.is_cancelled());
        assert!(!sessions.cancel("missing"));
    }

    #[test]
    fn engine_shutdown_reaches_session_tokens() {
        let sessions = Sessions::default();
        let shutdown = CancellationToken::new();
        let (cancel, _) = sessions.try_begin("demo", &shutdown).unwrap();

        shutdown.cancel();

        assert!(cancel.is_cancelled());
    }
}
