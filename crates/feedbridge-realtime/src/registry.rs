//! Registry of running push sessions, one per authorized user.
//!
//! All mutations happen under one lock. Starting a user that already has a
//! session cancels the old supervisor first, so at most one socket per user
//! is ever subscribed. Cancelled supervisors are kept until they exit, so
//! shutdown also waits for sessions stopped just before it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use feedbridge_core::UserId;
use feedbridge_session::{PushControl, Session, StateStore, StoreError};
use futures::future::join_all;
use metrics::gauge;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::PUSH_SESSIONS_ACTIVE;
use crate::supervisor::{PushEventHandler, Supervisor, SupervisorConfig, SupervisorStatus};

struct PushSession {
    cancel: CancellationToken,
    status: Arc<SupervisorStatus>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Sessions {
    active: HashMap<UserId, PushSession>,
    /// Cancelled supervisors that may still be closing their socket.
    retired: Vec<JoinHandle<()>>,
}

impl Sessions {
    fn retire(&mut self, session: PushSession) {
        session.cancel.cancel();
        self.retired.retain(|h| !h.is_finished());
        self.retired.push(session.handle);
    }
}

/// Owns every supervisor task.
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    config: Arc<SupervisorConfig>,
    handler: Arc<dyn PushEventHandler>,
    shutdown: CancellationToken,
}

impl SessionRegistry {
    /// Empty registry. Supervisors dispatch events to `handler`.
    pub fn new(config: SupervisorConfig, handler: Arc<dyn PushEventHandler>) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            config: Arc::new(config),
            handler,
            shutdown: CancellationToken::new(),
        }
    }

    /// Start (or restart) the push session of an authorized user.
    ///
    /// Returns `false` without side effects if the session has no credential
    /// or the registry is shutting down.
    pub fn start(&self, session: &Session) -> bool {
        let Some(credential) = session.credential.clone() else {
            debug!(user_id = %session.user_id, "not starting push session without credential");
            return false;
        };
        if self.shutdown.is_cancelled() {
            return false;
        }

        let user_id = session.user_id;
        let mut sessions = self.sessions.lock();
        if let Some(previous) = sessions.active.remove(&user_id) {
            debug!(%user_id, "replacing push session");
            sessions.retire(previous);
        }

        let cancel = self.shutdown.child_token();
        let status = Arc::new(SupervisorStatus::new());
        let supervisor = Supervisor::new(
            user_id,
            credential,
            self.config.clone(),
            self.handler.clone(),
            status.clone(),
        );
        let handle = tokio::spawn(supervisor.run(cancel.clone()));
        let _ = sessions.active.insert(
            user_id,
            PushSession {
                cancel,
                status,
                handle,
            },
        );
        gauge!(PUSH_SESSIONS_ACTIVE).set(sessions.active.len() as f64);
        info!(%user_id, "push session started");
        true
    }

    /// Stop a user's push session. Returns whether one was running.
    pub fn stop(&self, user_id: UserId) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.active.remove(&user_id) else {
            return false;
        };
        sessions.retire(session);
        gauge!(PUSH_SESSIONS_ACTIVE).set(sessions.active.len() as f64);
        info!(%user_id, "push session stopped");
        true
    }

    /// Start a session for every authorized user in `store`.
    pub fn start_all(&self, store: &dyn StateStore) -> Result<usize, StoreError> {
        let started = store
            .authorized()?
            .iter()
            .filter(|session| self.start(session))
            .count();
        info!(count = started, "push sessions restored");
        Ok(started)
    }

    /// Whether `user_id` has a registered session.
    pub fn is_active(&self, user_id: UserId) -> bool {
        self.sessions.lock().active.contains_key(&user_id)
    }

    /// Number of registered sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.lock().active.len()
    }

    /// Status handle of a user's session.
    pub fn status(&self, user_id: UserId) -> Option<Arc<SupervisorStatus>> {
        self.sessions
            .lock()
            .active
            .get(&user_id)
            .map(|s| s.status.clone())
    }

    /// Cancel every session and wait up to `timeout` for supervisors to exit,
    /// including ones stopped or replaced earlier that are still closing.
    ///
    /// Returns `false` if some supervisors were still running at the deadline;
    /// those are aborted.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.shutdown.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut sessions = self.sessions.lock();
            let mut handles: Vec<_> = sessions.retired.drain(..).collect();
            handles.extend(sessions.active.drain().map(|(_, s)| s.handle));
            handles
        };
        gauge!(PUSH_SESSIONS_ACTIVE).set(0.0);
        if handles.is_empty() {
            return true;
        }

        let count = handles.len();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(timeout, join_all(handles)).await.is_ok() {
            info!(count, "push sessions shut down");
            true
        } else {
            warn!(count, ?timeout, "push sessions did not stop in time, aborting");
            for abort in aborts {
                abort.abort();
            }
            false
        }
    }
}

impl PushControl for SessionRegistry {
    fn start(&self, session: &Session) -> bool {
        SessionRegistry::start(self, session)
    }

    fn stop(&self, user_id: UserId) -> bool {
        SessionRegistry::stop(self, user_id)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use feedbridge_core::Credential;
    use feedbridge_session::MemoryStateStore;
    use serde_json::Value;

    use super::*;
    use crate::supervisor::ConnectionState;

    struct Discard;

    #[async_trait]
    impl PushEventHandler for Discard {
        async fn handle_event(&self, _user_id: UserId, _name: &str, _data: Value) {}
    }

    fn registry() -> SessionRegistry {
        // Nothing listens on port 9; every connect attempt fails fast.
        let mut config = SupervisorConfig::new("ws://127.0.0.1:9");
        config.reconnect_backoff = Duration::from_secs(3600);
        SessionRegistry::new(config, Arc::new(Discard))
    }

    fn authorized(id: i64) -> Session {
        Session::new(UserId::new(id)).authorize(Credential {
            username: format!("user{id}"),
            access_token: "tok".into(),
            feed_handle: "feed".into(),
        })
    }

    #[tokio::test]
    async fn start_requires_credential() {
        let reg = registry();
        assert!(!reg.start(&Session::new(UserId::new(1))));
        assert_eq!(reg.active_count(), 0);
    }

    #[tokio::test]
    async fn restart_keeps_one_session() {
        let reg = registry();
        assert!(reg.start(&authorized(1)));
        let first = reg.status(UserId::new(1)).unwrap();
        assert!(reg.start(&authorized(1)));
        assert_eq!(reg.active_count(), 1);
        let second = reg.status(UserId::new(1)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(reg.shutdown(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let reg = registry();
        assert!(reg.start(&authorized(2)));
        let status = reg.status(UserId::new(2)).unwrap();
        assert!(reg.stop(UserId::new(2)));
        assert!(!reg.stop(UserId::new(2)));
        assert!(!reg.is_active(UserId::new(2)));

        tokio::time::timeout(Duration::from_secs(5), async {
            while status.state() != ConnectionState::Closed {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_stopped_and_replaced_sessions() {
        let reg = registry();
        assert!(reg.start(&authorized(1)));
        let replaced = reg.status(UserId::new(1)).unwrap();
        assert!(reg.start(&authorized(1)));
        assert!(reg.start(&authorized(2)));
        let stopped = reg.status(UserId::new(2)).unwrap();
        assert!(reg.stop(UserId::new(2)));

        assert!(reg.shutdown(Duration::from_secs(5)).await);
        assert_eq!(replaced.state(), ConnectionState::Closed);
        assert_eq!(stopped.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn start_all_restores_authorized_sessions() {
        let store = MemoryStateStore::new();
        store.save(&authorized(1)).unwrap();
        store.save(&authorized(2)).unwrap();
        store.save(&Session::new(UserId::new(3))).unwrap();

        let reg = registry();
        assert_eq!(reg.start_all(&store).unwrap(), 2);
        assert!(reg.is_active(UserId::new(1)));
        assert!(!reg.is_active(UserId::new(3)));
        assert!(reg.shutdown(Duration::from_secs(5)).await);
        assert_eq!(reg.active_count(), 0);
    }

    #[tokio::test]
    async fn no_starts_after_shutdown() {
        let reg = registry();
        assert!(reg.shutdown(Duration::from_secs(1)).await);
        assert!(!reg.start(&authorized(1)));
    }
}
