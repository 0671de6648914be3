//! Image decoding, style catalogs, and background frame loading.

pub mod catalog;
pub mod decode;
pub mod frames;
