// TrafficVision Ingestion Module
//
// Batch pipeline for the TrafficVision public dataset: per-video `.tar.gz`
// archives of vehicle-detection logs, staged in an object-store bucket.
//
// The pipeline runs as three externally scheduled phases:
// - transfer_source: bulk-copy raw archives into the staging bucket
// - generate_batch_metadata_files: partition the archive listing into
//   fixed-size batches and persist one manifest file per batch
// - run_batch_data: process the manifests assigned to this worker slot
//   (download, unpack, rewrite, upload, clean up)
//
// Parallelism is external: the scheduler launches `batch_group_size`
// containers, each with a distinct `batch_ordinal`, over disjoint manifest
// subsets. One invocation is strictly sequential.

pub mod batch;
pub mod config;
pub mod manifest;
pub mod pipeline;
pub mod staging;
pub mod transfer;
pub mod transform;

// Re-export main types
pub use batch::BatchProcessor;
pub use config::{PipelineMode, TrafficVisionParams};
pub use manifest::{BatchManifest, ManifestRecord};
pub use pipeline::TrafficVisionPipeline;
pub use staging::StagingArea;

/// Archive suffix selecting source objects; anything else is skipped.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Manifest file naming: `batch_metadata-NNNNNN.txt`.
pub const MANIFEST_PREFIX: &str = "batch_metadata-";
pub const MANIFEST_EXTENSION: &str = ".txt";
pub const MANIFEST_NUMBER_WIDTH: usize = 6;

/// Log file expected inside each unpacked archive, keyed by guid.
pub const ARCHIVE_LOG_NAME: &str = "out.log";

/// Leading field marking rewritable detection records.
pub const FRAME_MARKER: &str = "{\"frame\"";

/// Result type for TrafficVision operations
pub type Result<T> = std::result::Result<T, TrafficVisionError>;

/// Error types for the TrafficVision pipeline
#[derive(Debug, thiserror::Error)]
pub enum TrafficVisionError {
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<anyhow::Error> for TrafficVisionError {
    fn from(err: anyhow::Error) -> Self {
        TrafficVisionError::Storage(err)
    }
}

impl From<csv::Error> for TrafficVisionError {
    fn from(err: csv::Error) -> Self {
        TrafficVisionError::Manifest(err.to_string())
    }
}
