//! PDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the PDP pipeline workspace:
//!
//! - **Error Handling**: Custom error and result types
//! - **Checksums**: File integrity utilities used by the storage adapter
//! - **Logging**: Tracing configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use pdp_common::checksum::{compute_file_checksum, ChecksumAlgorithm};
//!
//! fn stamp(path: &str) -> pdp_common::Result<String> {
//!     compute_file_checksum(path, ChecksumAlgorithm::Sha256)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{PdpError, Result};
