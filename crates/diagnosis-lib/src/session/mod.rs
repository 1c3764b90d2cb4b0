//! Client sessions over the persistent bidirectional channel

mod channel;
mod registry;

pub use channel::SessionChannel;
pub use registry::{SessionError, SessionHandle, SessionRegistry, SESSION_BUFFER};
