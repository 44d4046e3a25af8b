//! PDP Ingest Library
//!
//! Batch ETL pipelines for public datasets: download, reshape, and re-upload
//! dataset files through an S3-compatible object store.
//!
//! # Pipelines
//!
//! - **TrafficVision**: batch-oriented ingestion of vehicle-detection video
//!   log archives. Partitions the remote archive listing into fixed-size
//!   batches, persists one manifest file per batch, and processes each batch
//!   group independently (download, unpack, rewrite, upload, clean up).
//!
//! # Example
//!
//! ```no_run
//! use pdp_ingest::trafficvision::{TrafficVisionParams, TrafficVisionPipeline};
//!
//! async fn run(params: TrafficVisionParams) -> anyhow::Result<()> {
//!     let pipeline = TrafficVisionPipeline::new(params).await?;
//!     pipeline.run().await?;
//!     Ok(())
//! }
//! ```

pub mod retry;
pub mod storage;
pub mod trafficvision;
