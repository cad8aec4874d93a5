//! Per-operation subscription sessions.
//!
//! A [`SubscriptionSession`] is the live binding of one operation id to
//! the forwarding task draining its source sequence. Sessions are keyed by
//! operation id in a per-connection [`SessionMap`] and destroyed on client
//! stop, connection close, or sequence completion/error.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// The live binding of one operation to its forwarding task.
pub struct SubscriptionSession {
    task: JoinHandle<()>,
}

impl SubscriptionSession {
    /// Wrap the forwarding task spawned for one operation.
    #[must_use]
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Cancel the forwarding task, unsubscribing from its sequence.
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Sessions keyed by operation id, shared between the connection loop and
/// the forwarding tasks that remove themselves on completion.
#[derive(Clone, Default)]
pub struct SessionMap {
    inner: Arc<Mutex<HashMap<String, SubscriptionSession>>>,
}

impl SessionMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation id is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }

    /// Register a session under an operation id.
    pub fn insert(&self, id: String, session: SubscriptionSession) {
        self.inner.lock().insert(id, session);
    }

    /// Remove a session without cancelling it, for tasks that finished on
    /// their own.
    pub fn forget(&self, id: &str) {
        self.inner.lock().remove(id);
    }

    /// Cancel and discard the session for one operation id.
    ///
    /// Returns whether a session was live under that id. Sibling
    /// operations are unaffected.
    pub fn cancel(&self, id: &str) -> bool {
        match self.inner.lock().remove(id) {
            Some(session) => {
                debug!(operation_id = %id, "cancelling subscription session");
                session.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and discard every live session, for connection teardown.
    pub fn cancel_all(&self) {
        let sessions: Vec<_> = self.inner.lock().drain().collect();
        if !sessions.is_empty() {
            debug!(count = sessions.len(), "cancelling all subscription sessions");
        }
        for (_, session) in sessions {
            session.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending_session() -> SubscriptionSession {
        SubscriptionSession::new(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }))
    }

    #[tokio::test]
    async fn test_cancel_removes_only_target() {
        let sessions = SessionMap::new();
        sessions.insert("a".to_string(), pending_session());
        sessions.insert("b".to_string(), pending_session());

        assert!(sessions.cancel("a"));
        assert!(!sessions.contains("a"));
        assert!(sessions.contains("b"));

        sessions.cancel_all();
    }

    #[tokio::test]
    async fn test_cancel_unknown_id() {
        let sessions = SessionMap::new();
        assert!(!sessions.cancel("missing"));
    }

    #[tokio::test]
    async fn test_cancel_all_empties_map() {
        let sessions = SessionMap::new();
        sessions.insert("a".to_string(), pending_session());
        sessions.insert("b".to_string(), pending_session());

        sessions.cancel_all();
        assert!(!sessions.contains("a"));
        assert!(!sessions.contains("b"));
    }

    #[tokio::test]
    async fn test_forget_leaves_task_running() {
        let sessions = SessionMap::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        sessions.insert(
            "a".to_string(),
            SubscriptionSession::new(tokio::spawn(async move {
                let _ = tx.send(());
            })),
        );

        sessions.forget("a");
        assert!(!sessions.contains("a"));
        // The task still ran to completion.
        rx.await.unwrap();
    }
}
