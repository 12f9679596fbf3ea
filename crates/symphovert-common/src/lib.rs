//! Symphovert Common Library
//!
//! Shared utilities for the Symphovert workspace:
//!
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Checksums**: digests recorded for every master copy
//! - **Logging**: `tracing` subscriber setup shared by all binaries

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
