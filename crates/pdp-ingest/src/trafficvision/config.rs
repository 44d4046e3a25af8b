//! Invocation parameters for the TrafficVision pipeline
//!
//! Every parameter is a CLI flag with an environment-variable fallback, so
//! the scheduler can configure containerized runs through the environment
//! alone.

use super::staging::StagingArea;
use super::{Result, TrafficVisionError};
use crate::storage::ObjectUrl;
use std::path::PathBuf;

/// Phase to run; one invocation executes exactly one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Bulk-copy raw source archives into the staging bucket
    TransferSource,
    /// Partition the staged archive listing into batch manifest files
    GenerateBatchMetadataFiles,
    /// Process the manifests assigned to this worker slot
    RunBatchData,
}

impl PipelineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineMode::TransferSource => "transfer_source",
            PipelineMode::GenerateBatchMetadataFiles => "generate_batch_metadata_files",
            PipelineMode::RunBatchData => "run_batch_data",
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one pipeline invocation.
#[derive(Debug, Clone, clap::Args)]
pub struct TrafficVisionParams {
    /// Source location of the archives (s3://bucket/prefix)
    #[arg(long, env = "SOURCE_URL")]
    pub source_url: String,

    /// Number of archives per batch manifest
    #[arg(long, env = "SOURCE_FILE_BATCH_LENGTH", default_value_t = 100)]
    pub batch_length: usize,

    /// Destination bucket for manifests and rewritten logs
    #[arg(long, env = "TARGET_BUCKET")]
    pub target_bucket: String,

    /// Destination prefix inside the target bucket
    #[arg(long, env = "TARGET_PATH")]
    pub target_path: String,

    /// Local staging root for transient artifacts
    #[arg(long, env = "TARGET_ROOT_PATH")]
    pub root_path: PathBuf,

    /// Staging subfolder for downloaded archives
    #[arg(long, env = "TARGET_SOURCE_FOLDER", default_value = "source")]
    pub source_folder: String,

    /// Staging subfolder for extracted archives
    #[arg(long, env = "TARGET_UNPACK_FOLDER", default_value = "unpack")]
    pub unpack_folder: String,

    /// Staging subfolder for rewritten logs awaiting upload
    #[arg(long, env = "TARGET_LOAD_FOLDER", default_value = "load")]
    pub load_folder: String,

    /// Staging subfolder for local manifest copies
    #[arg(long, env = "TARGET_BATCH_FOLDER", default_value = "batch")]
    pub batch_folder: String,

    /// Project identifier, used to label runs in logs
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// Phase to run
    #[arg(long = "pipeline", env = "PIPELINE_NAME", value_enum)]
    pub pipeline: PipelineMode,

    /// Total number of parallel worker slots
    #[arg(long, env = "BATCH_GROUP_SIZE", default_value_t = 1)]
    pub batch_group_size: u32,

    /// 1-based slot of this invocation
    #[arg(long, env = "BATCH_ORDINAL", default_value_t = 1)]
    pub batch_ordinal: u32,
}

impl TrafficVisionParams {
    pub fn validate(&self) -> Result<()> {
        if self.batch_length == 0 {
            return Err(TrafficVisionError::Validation(
                "batch length must be at least 1".to_string(),
            ));
        }
        if self.batch_group_size == 0 {
            return Err(TrafficVisionError::Validation(
                "batch group size must be at least 1".to_string(),
            ));
        }
        if self.batch_ordinal == 0 || self.batch_ordinal > self.batch_group_size {
            return Err(TrafficVisionError::Validation(format!(
                "batch ordinal {} outside worker slots 1..={}",
                self.batch_ordinal, self.batch_group_size
            )));
        }
        if self.target_bucket.is_empty() {
            return Err(TrafficVisionError::Validation(
                "target bucket must not be empty".to_string(),
            ));
        }
        self.source()?;
        Ok(())
    }

    /// Parsed source location.
    pub fn source(&self) -> Result<ObjectUrl> {
        ObjectUrl::parse(&self.source_url)
            .map_err(|e| TrafficVisionError::Validation(e.to_string()))
    }

    /// Destination prefix for batch manifest files.
    pub fn batch_prefix(&self) -> String {
        format!("{}/{}", self.target_path, self.batch_folder)
    }

    /// Destination prefix for rewritten log files.
    pub fn load_prefix(&self) -> String {
        format!("{}/{}", self.target_path, self.load_folder)
    }

    /// Destination prefix bulk-copied archives land under.
    pub fn transfer_prefix(&self) -> String {
        format!("{}/{}", self.target_path, self.source_folder)
    }

    /// Staging layout derived from the root path and subfolder names.
    pub fn staging(&self) -> StagingArea {
        StagingArea::new(
            &self.root_path,
            &self.source_folder,
            &self.unpack_folder,
            &self.load_folder,
            &self.batch_folder,
        )
    }
}
