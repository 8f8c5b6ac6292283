//! Session store — owns all live applicant sessions.
//!
//! Injected into the transport layer rather than held as ambient state.
//! Each session is wrapped in its own `Mutex`; a turn handler holds that
//! lock for the whole turn, which gives strict per-session ordering while
//! leaving other sessions fully concurrent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::model::Session;

/// Shared handle to one applicant session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Store of live sessions keyed by session identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a fresh session and return its handle.
    async fn create(&self) -> (Uuid, SessionHandle);

    /// Get a session by id.
    async fn get(&self, id: Uuid) -> Option<SessionHandle>;

    /// Discard a session. No-op if absent.
    async fn remove(&self, id: Uuid);

    /// Number of live sessions.
    async fn len(&self) -> usize;
}

/// In-memory session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle: SessionHandle = Arc::new(Mutex::new(Session::new(id)));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        tracing::debug!(session = %id, "session created");
        (id, handle)
    }

    async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    async fn remove(&self, id: Uuid) {
        if self.sessions.write().await.remove(&id).is_some() {
            tracing::debug!(session = %id, "session discarded");
        }
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
