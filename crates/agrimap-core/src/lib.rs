//! # agrimap-core
//!
//! Core types, traits, and abstractions for the AgriMap map-analysis
//! pipeline.
//!
//! This crate provides the foundational data structures, the collaborator
//! trait definitions, and the zone conversion logic that the other agrimap
//! crates depend on.

pub mod convert;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod upload;

// Re-export commonly used types at crate root
pub use convert::{convert_zone, ConvertContext};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use upload::{sanitize_filename, validate_map_image};
