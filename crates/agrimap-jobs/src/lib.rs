//! # agrimap-jobs
//!
//! The map-analysis job pipeline for AgriMap.
//!
//! This crate provides:
//! - A fixed-size worker pool running analysis jobs to completion
//! - An injectable staging store holding each job's terminal result until
//!   it is confirmed or discarded
//! - Per-job progress broadcast channels for live subscribers
//! - A janitor bounding the staging store by age and size
//! - The pipeline coordinator tying submission, execution, staging, and
//!   confirmation together
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agrimap_jobs::{AnalysisPipeline, InMemoryJobStore, PoolConfig, ProgressChannels, WorkerPool};
//!
//! let store = Arc::new(InMemoryJobStore::new());
//! let channels = Arc::new(ProgressChannels::new());
//! let pool = WorkerPool::new(backend, store.clone(), channels.clone(), PoolConfig::from_env());
//! let pipeline = AnalysisPipeline::new(store, channels, pool.start(), zones, images, identity);
//!
//! let receipt = pipeline.submit(upload).await?;
//! let status = pipeline.status(receipt.job_id).await;
//! ```

pub mod janitor;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod worker;

pub use janitor::Janitor;
pub use pipeline::AnalysisPipeline;
pub use progress::ProgressChannels;
pub use store::{InMemoryJobStore, JobStore, SweepStats};
pub use worker::{AnalysisTask, PoolConfig, PoolHandle, WorkerPool};
