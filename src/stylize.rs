//! Generative restyling through an external image service.

pub mod gateway;
pub mod service;
