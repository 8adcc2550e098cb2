//! CDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the CDP workspace:
//!
//! - **Error Handling**: the [`CdpError`] type and [`Result`] alias
//! - **Logging**: tracing subscriber configuration and initialization
//! - **Checksums**: streaming file fingerprinting

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CdpError, Result};
