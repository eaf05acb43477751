//! API request and response models.
//!
//! - [`quiz`]: Quiz questions, the quiz response envelope and the upload form description

pub mod quiz;
