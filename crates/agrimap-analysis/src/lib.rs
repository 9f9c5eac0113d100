//! # agrimap-analysis
//!
//! Analysis backend abstraction for the AgriMap pipeline.
//!
//! The pipeline treats map-image understanding as an external collaborator:
//! a backend receives the image plus submission parameters, reports
//! progress through a callback as it advances, and returns a structured
//! [`AnalysisOutcome`](agrimap_core::AnalysisOutcome) of untrusted zone
//! candidates. This crate defines that contract and ships a
//! vision-LLM-backed implementation; a deterministic mock lives behind the
//! `mock` feature.

pub mod backend;
mod parse;
pub mod vision;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::{AnalysisBackend, AnalysisRequest, ProgressFn};
pub use vision::VisionAnalysisBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockAnalysisBackend;
