//! Real-time call session handling: status state machine, SDK boundary, and
//! the lifecycle orchestrator.

pub mod call_machine;
pub mod loopback;
pub mod media;
pub mod side_effects;
pub mod status;

pub use call_machine::CallMachine;
pub use loopback::LoopbackConnector;
pub use media::{CallIdentity, JoinAddress, MediaConnector, MediaSession, SessionEvent};
pub use side_effects::SideEffects;
pub use status::{SessionState, SessionStatus, SessionStatusHandle};
