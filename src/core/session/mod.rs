//! Session orchestration: callback bridging, turns and teardown

mod bridge;
mod errors;
mod orchestrator;
mod turn_task;


pub use bridge::{AsyncTarget, CallbackBridge, HandlerKind, SyncTarget};
pub use errors::{DispatchError, SessionError, SessionResult};
pub use orchestrator::SessionOrchestrator;
