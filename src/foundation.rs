//! Shared primitives: geometry, configuration, errors.

pub mod config;
pub mod core;
pub mod error;
