//! Diagnosis relay library
//!
//! This crate provides the core functionality for:
//! - Validating client feature vectors
//! - Invoking the external classifier process
//! - Mapping classifier output to a diagnosis
//! - Routing replies to the originating session
//! - Health checks and observability

pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod observability;
pub mod session;

pub use classifier::{Classifier, ClassifierConfig, ProcessInvoker};
pub use coordinator::{DiagnosisCoordinator, RequestState};
pub use error::{DiagnosisError, ErrorKind, ProcessError, ValidationError};
pub use events::{InboundEvent, OutboundEvent, ResultsPayload};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DiagnosisMetrics, StructuredLogger};
pub use session::{SessionChannel, SessionRegistry};
