//! Process-wide registry of connected sessions
//!
//! Maps each live `SessionId` to the sender feeding that client's outbound
//! frames. Only connect/disconnect mutate the map; reply delivery reads it.

use crate::events::OutboundEvent;
use crate::models::SessionId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// Outbound events buffered per session before delivery waits
pub const SESSION_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session registry is shut down")]
    RegistryClosed,

    #[error("{0} is not connected")]
    NotConnected(SessionId),
}

/// A newly connected session and the stream of events addressed to it
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub events: mpsc::Receiver<OutboundEvent>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: DashMap<SessionId, mpsc::Sender<OutboundEvent>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Shared session registry, created at startup and shut down on exit
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session
    pub fn connect(&self) -> Result<SessionHandle, SessionError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(SessionError::RegistryClosed);
        }

        let id = SessionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.inner.sessions.insert(id, tx);
        Ok(SessionHandle { id, events: rx })
    }

    /// Remove a session; returns false if it was not registered
    pub fn disconnect(&self, id: SessionId) -> bool {
        self.inner.sessions.remove(&id).is_some()
    }

    /// Deliver an event to exactly one session
    pub async fn send(&self, id: SessionId, event: OutboundEvent) -> Result<(), SessionError> {
        // Clone the sender so no map guard is held across the await
        let sender = self
            .inner
            .sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::NotConnected(id))?;

        sender
            .send(event)
            .await
            .map_err(|_| SessionError::NotConnected(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.inner.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Refuse new sessions and drop every outbound sender.
    ///
    /// Each session's event stream ends, which closes its connection.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let dropped = self.inner.sessions.len();
        self.inner.sessions.clear();
        info!(sessions = dropped, "Session registry shut down");
    }
}
