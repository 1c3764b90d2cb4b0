//! Per-request diagnosis orchestration
//!
//! Drives one request through validation, classifier invocation and output
//! mapping. Every request ends in exactly one `ResultsPayload`, whether it
//! succeeded or failed at any stage.

use crate::classifier::{map_output, Classifier, DEFAULT_INVOCATION_TIMEOUT};
use crate::error::DiagnosisError;
use crate::events::ResultsPayload;
use crate::health::{components, HealthRegistry};
use crate::models::{ClassificationRequest, Diagnosis};
use crate::observability::{DiagnosisMetrics, StructuredLogger, OUTCOME_SUCCESS};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validating,
    Invoking,
    Mapping,
    Replied,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Received => "received",
            RequestState::Validating => "validating",
            RequestState::Invoking => "invoking",
            RequestState::Mapping => "mapping",
            RequestState::Replied => "replied",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(request: &ClassificationRequest, state: RequestState) {
    debug!(
        request_id = request.request_id,
        session = %request.session_id,
        state = %state,
        "Request state changed"
    );
}

/// Orchestrates diagnosis requests against a classifier backend
#[derive(Clone)]
pub struct DiagnosisCoordinator {
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
    health: HealthRegistry,
    metrics: DiagnosisMetrics,
    logger: StructuredLogger,
}

impl DiagnosisCoordinator {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            timeout: DEFAULT_INVOCATION_TIMEOUT,
            health: HealthRegistry::new(),
            metrics: DiagnosisMetrics::new(),
            logger: StructuredLogger::new("local"),
        }
    }

    /// Bound on a single classifier invocation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report classifier health to a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the pipeline for one request and return its diagnosis.
    ///
    /// Validation failures return before any process is spawned.
    pub async fn diagnose(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Diagnosis, DiagnosisError> {
        transition(request, RequestState::Validating);
        let vector = request.vector.validate()?;

        transition(request, RequestState::Invoking);
        let invocation = match tokio::time::timeout(self.timeout, self.classifier.invoke(&vector)).await
        {
            Ok(Ok(invocation)) => invocation,
            Ok(Err(e)) => {
                self.health
                    .set_degraded(components::CLASSIFIER, e.to_string())
                    .await;
                return Err(e.into());
            }
            Err(_) => {
                // The invocation future is dropped here, which kills the child
                self.health
                    .set_degraded(
                        components::CLASSIFIER,
                        format!("invocation exceeded {}s", self.timeout.as_secs_f64()),
                    )
                    .await;
                return Err(DiagnosisError::Timeout(self.timeout));
            }
        };

        self.metrics.observe_invocation_latency(invocation.elapsed);
        if !invocation.stderr.is_empty() {
            self.metrics.inc_classifier_stderr();
        }
        self.health.set_healthy(components::CLASSIFIER).await;

        transition(request, RequestState::Mapping);
        map_output(&invocation.stdout)
    }

    /// Run one request to its single reply payload.
    ///
    /// All errors are absorbed here; the caller only delivers the payload.
    pub async fn handle(&self, request: &ClassificationRequest) -> ResultsPayload {
        let start = Instant::now();
        transition(request, RequestState::Received);

        let result = self.diagnose(request).await;

        match &result {
            Ok(diagnosis) => {
                self.metrics.inc_requests(OUTCOME_SUCCESS);
                self.logger.log_diagnosis(
                    request.session_id,
                    request.request_id,
                    *diagnosis,
                    start.elapsed(),
                );
                transition(request, RequestState::Replied);
            }
            Err(e) => {
                self.metrics.inc_requests(e.kind().as_str());
                self.logger
                    .log_diagnosis_failure(request.session_id, request.request_id, e);
                transition(request, RequestState::Failed);
            }
        }

        ResultsPayload::from(&result)
    }
}
