//! HTTP request handlers.
//!
//! - [`quiz`]: Quiz generation from uploaded or pasted notes

pub mod quiz;
