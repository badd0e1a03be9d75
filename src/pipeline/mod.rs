//! # Pipeline Module
//!
//! End-to-end orchestration: fetch, segment, composite, upload.

pub mod engine;

pub use engine::{PipelineEngine, PipelineOutput};
