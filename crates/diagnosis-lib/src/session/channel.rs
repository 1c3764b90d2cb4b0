//! Routing between client sessions and the diagnosis coordinator

use super::registry::{SessionError, SessionHandle, SessionRegistry};
use crate::coordinator::DiagnosisCoordinator;
use crate::events::{InboundEvent, OutboundEvent};
use crate::models::{ClassificationRequest, RawInputVector, SessionId};
use crate::observability::{DiagnosisMetrics, StructuredLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Session channel: opens/closes sessions and dispatches their requests.
///
/// Each `diagnosis request` event becomes its own task, so requests from one
/// session run concurrently and may complete out of order.
#[derive(Clone)]
pub struct SessionChannel {
    registry: SessionRegistry,
    coordinator: DiagnosisCoordinator,
    logger: StructuredLogger,
    metrics: DiagnosisMetrics,
    next_request_id: Arc<AtomicU64>,
}

impl SessionChannel {
    pub fn new(
        registry: SessionRegistry,
        coordinator: DiagnosisCoordinator,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            registry,
            coordinator,
            logger,
            metrics: DiagnosisMetrics::new(),
            next_request_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a newly connected client
    pub fn open(&self) -> Result<SessionHandle, SessionError> {
        let handle = self.registry.connect()?;
        let active = self.registry.len();
        self.metrics.set_active_sessions(active as i64);
        self.logger.log_session_connected(handle.id, active);
        Ok(handle)
    }

    /// Forget a disconnected client. In-flight requests keep running; their
    /// replies are discarded.
    pub fn close(&self, session: SessionId) {
        if self.registry.disconnect(session) {
            let active = self.registry.len();
            self.metrics.set_active_sessions(active as i64);
            self.logger.log_session_disconnected(session, active);
        }
    }

    /// Handle one inbound text frame.
    ///
    /// Returns the spawned request task, or `None` if the frame was not a
    /// recognised event.
    pub fn handle_frame(&self, session: SessionId, frame: &str) -> Option<JoinHandle<()>> {
        match serde_json::from_str::<InboundEvent>(frame) {
            Ok(InboundEvent::Diagnosis(vector)) => Some(self.submit(session, vector)),
            Err(e) => {
                warn!(session = %session, error = %e, "Ignoring malformed frame");
                None
            }
        }
    }

    /// Spawn the pipeline for one request; its single reply goes to `session`
    pub fn submit(&self, session: SessionId, vector: RawInputVector) -> JoinHandle<()> {
        let request = ClassificationRequest {
            request_id: self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1,
            session_id: session,
            vector,
        };
        debug!(session = %session, request_id = request.request_id, "New diagnosis request");

        let coordinator = self.coordinator.clone();
        let registry = self.registry.clone();

        tokio::spawn(async move {
            let payload = coordinator.handle(&request).await;
            if let Err(e) = registry.send(session, OutboundEvent::Results(payload)).await {
                debug!(
                    request_id = request.request_id,
                    error = %e,
                    "Dropping reply for departed session"
                );
            }
        })
    }
}
