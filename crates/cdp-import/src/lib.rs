//! CDP Import - Bulk snapshot ingestion pipeline
//!
//! Ingests the upstream provider's periodic court and judge snapshots and
//! reconciles them into the shared entity store, restricted to the
//! configured jurisdiction.
//!
//! # Pipeline
//!
//! ```text
//! orchestrator -> fetch -> stream -> parser -> filter -> reconcile
//!                     checkpoint + stats observe on a timer
//! ```
//!
//! Archives are streamed line by line and never decompressed into memory as
//! a whole. Progress is checkpointed so interrupted runs resume without
//! reprocessing, and upserts are field-scoped so columns owned by other
//! subsystems are never clobbered.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod reconcile;
pub mod stats;
pub mod store;
pub mod stream;

// Re-export the types most callers need
pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use models::Dataset;
pub use orchestrator::{ImportOrchestrator, RunMode, RunSummary};
