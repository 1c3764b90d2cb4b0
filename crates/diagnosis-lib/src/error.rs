//! Error types for the diagnosis pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Input vector rejected before any process is spawned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field {field} is missing")]
    MissingField { field: &'static str },

    #[error("field {field} is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field {field} is not a finite number")]
    NotFinite { field: &'static str },
}

/// The classifier could not be run to a clean exit
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn classifier {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier I/O failed while {stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Terminal failure of one diagnosis request
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("classifier process failed: {0}")]
    Process(#[from] ProcessError),

    #[error("classifier output not recognized: {raw:?}")]
    UnrecognizedOutput { raw: String },

    #[error("classifier did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Client-facing error marker carried in a `results` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    ProcessError,
    UnrecognizedOutput,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::ProcessError => "process_error",
            ErrorKind::UnrecognizedOutput => "unrecognized_output",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl DiagnosisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagnosisError::Validation(_) => ErrorKind::ValidationError,
            DiagnosisError::Process(_) => ErrorKind::ProcessError,
            DiagnosisError::UnrecognizedOutput { .. } => ErrorKind::UnrecognizedOutput,
            DiagnosisError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Message safe to forward to the client.
    ///
    /// Process diagnostics stay server-side; they may contain local paths.
    pub fn client_message(&self) -> String {
        match self {
            DiagnosisError::Validation(e) => e.to_string(),
            DiagnosisError::Process(_) => "diagnosis failed".to_string(),
            DiagnosisError::UnrecognizedOutput { .. } => "result unavailable".to_string(),
            DiagnosisError::Timeout(_) => "diagnosis timed out".to_string(),
        }
    }
}
