//! Observability infrastructure for the diagnosis relay
//!
//! Provides:
//! - Prometheus metrics (request outcomes, invocation latency, active sessions)
//! - Structured JSON logging with tracing

use crate::error::DiagnosisError;
use crate::models::{Diagnosis, SessionId};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for classifier invocation latency (in seconds)
const INVOCATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Outcome label for a successful request
pub const OUTCOME_SUCCESS: &str = "success";

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DiagnosisMetricsInner> = OnceLock::new();

struct DiagnosisMetricsInner {
    requests_total: IntCounterVec,
    invocation_latency_seconds: Histogram,
    active_sessions: IntGauge,
    classifier_stderr_total: IntCounter,
}

impl DiagnosisMetricsInner {
    fn new() -> Self {
        Self {
            requests_total: register_int_counter_vec!(
                "diagnosis_requests_total",
                "Diagnosis requests by terminal outcome",
                &["outcome"]
            )
            .expect("Failed to register requests_total"),

            invocation_latency_seconds: register_histogram!(
                "diagnosis_invocation_latency_seconds",
                "Wall time of one classifier process invocation",
                INVOCATION_BUCKETS.to_vec()
            )
            .expect("Failed to register invocation_latency_seconds"),

            active_sessions: register_int_gauge!(
                "diagnosis_active_sessions",
                "Number of connected client sessions"
            )
            .expect("Failed to register active_sessions"),

            classifier_stderr_total: register_int_counter!(
                "diagnosis_classifier_stderr_total",
                "Invocations where the classifier wrote to stderr"
            )
            .expect("Failed to register classifier_stderr_total"),
        }
    }
}

/// Relay metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct DiagnosisMetrics {
    _private: (),
}

impl Default for DiagnosisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosisMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DiagnosisMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DiagnosisMetricsInner {
        GLOBAL_METRICS.get_or_init(DiagnosisMetricsInner::new)
    }

    /// Count one request by outcome (`success` or an error kind)
    pub fn inc_requests(&self, outcome: &str) {
        self.inner()
            .requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn requests(&self, outcome: &str) -> u64 {
        self.inner()
            .requests_total
            .with_label_values(&[outcome])
            .get()
    }

    pub fn observe_invocation_latency(&self, elapsed: Duration) {
        self.inner()
            .invocation_latency_seconds
            .observe(elapsed.as_secs_f64());
    }

    pub fn set_active_sessions(&self, count: i64) {
        self.inner().active_sessions.set(count);
    }

    pub fn inc_classifier_stderr(&self) {
        self.inner().classifier_stderr_total.inc();
    }
}

/// Structured logger for relay events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log server startup
    pub fn log_startup(&self, version: &str, classifier: &str, model_dir: &str) {
        info!(
            event = "server_started",
            node = %self.node_name,
            server_version = %version,
            classifier = %classifier,
            model_dir = %model_dir,
            "Diagnosis server started"
        );
    }

    /// Log server shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Diagnosis server shutting down"
        );
    }

    pub fn log_session_connected(&self, session: SessionId, active: usize) {
        info!(
            event = "session_connected",
            node = %self.node_name,
            session = %session,
            active_sessions = active,
            "A user has connected"
        );
    }

    pub fn log_session_disconnected(&self, session: SessionId, active: usize) {
        info!(
            event = "session_disconnected",
            node = %self.node_name,
            session = %session,
            active_sessions = active,
            "User disconnected"
        );
    }

    /// Log a completed diagnosis
    pub fn log_diagnosis(
        &self,
        session: SessionId,
        request_id: u64,
        diagnosis: Diagnosis,
        elapsed: Duration,
    ) {
        info!(
            event = "diagnosis_completed",
            node = %self.node_name,
            session = %session,
            request_id = request_id,
            diagnosis = %diagnosis,
            prediction = %diagnosis.one_hot(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Diagnosis completed"
        );
    }

    /// Log a failed diagnosis with full server-side detail
    pub fn log_diagnosis_failure(&self, session: SessionId, request_id: u64, error: &DiagnosisError) {
        warn!(
            event = "diagnosis_failed",
            node = %self.node_name,
            session = %session,
            request_id = request_id,
            kind = %error.kind().as_str(),
            error = %error,
            "Diagnosis failed"
        );
    }
}
