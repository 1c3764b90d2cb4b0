//! Session channel wire events
//!
//! Every WebSocket text frame carries one JSON object of the form
//! `{"event": <name>, "data": <payload>}`.

use crate::error::{DiagnosisError, ErrorKind};
use crate::models::{Diagnosis, RawInputVector};
use serde::{Deserialize, Serialize};

/// `prediction` value sent when no diagnosis could be produced
pub const PREDICTION_UNAVAILABLE: &str = "unavailable";

/// Events a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum InboundEvent {
    /// Request a diagnosis for one feature vector
    #[serde(rename = "diagnosis request", alias = "diagnosis")]
    Diagnosis(RawInputVector),
}

/// Events the server sends to one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// Outcome of one diagnosis request
    Results(ResultsPayload),
}

/// Payload of a `results` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    /// One-hot triplet, or `unavailable` on failure
    pub prediction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Diagnosis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultsPayload {
    pub fn success(diagnosis: Diagnosis) -> Self {
        Self {
            prediction: diagnosis.one_hot().to_string(),
            label: Some(diagnosis),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: &DiagnosisError) -> Self {
        Self {
            prediction: PREDICTION_UNAVAILABLE.to_string(),
            label: None,
            error: Some(error.kind()),
            message: Some(error.client_message()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<&Result<Diagnosis, DiagnosisError>> for ResultsPayload {
    fn from(result: &Result<Diagnosis, DiagnosisError>) -> Self {
        match result {
            Ok(diagnosis) => Self::success(*diagnosis),
            Err(e) => Self::failure(e),
        }
    }
}
