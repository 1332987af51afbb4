//! API route modules.

pub mod calls;
pub mod flow;
pub mod session;
