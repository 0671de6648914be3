//! Camera boundary and the four-slot capture state machine.

pub mod camera;
pub mod session;
