//! External classifier invocation and output mapping

mod invoker;
mod mapper;

pub use invoker::{
    stdin_protocol, ClassifierConfig, ClassifierInvocation, ProcessInvoker,
    DEFAULT_INVOCATION_TIMEOUT,
};
pub use mapper::map_output;

use crate::error::ProcessError;
use crate::models::InputVector;
use async_trait::async_trait;

/// Trait for classifier backends
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Run one classification for a validated vector.
    ///
    /// Every call is an independent invocation; implementations must not
    /// share a running process between calls.
    async fn invoke(&self, input: &InputVector) -> Result<ClassifierInvocation, ProcessError>;
}
