//! Screen flow of a booth session.

pub mod orchestrator;
