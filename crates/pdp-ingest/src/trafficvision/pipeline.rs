//! Phase orchestration for the TrafficVision pipeline
//!
//! Owns the storage handles and staging layout for one invocation and runs
//! exactly one phase. Every phase is safe to re-run: manifest generation
//! clears its destination prefixes first, and batch processing overwrites
//! its staging paths and re-uploads idempotently.

use super::batch::{select_assigned, BatchProcessor};
use super::config::{PipelineMode, TrafficVisionParams};
use super::manifest::plan_batches;
use super::staging::StagingArea;
use super::transfer::copy_source_archives;
use super::Result;
use crate::storage::{Storage, StorageConfig};
use tracing::info;

/// One parameterized unit of pipeline work.
pub struct TrafficVisionPipeline {
    params: TrafficVisionParams,
    source_store: Storage,
    target_store: Storage,
    staging: StagingArea,
}

impl TrafficVisionPipeline {
    /// Validate parameters and build storage handles for both buckets.
    pub async fn new(params: TrafficVisionParams) -> Result<Self> {
        params.validate()?;

        let storage_config = StorageConfig::from_env()?;
        let source = params.source()?;
        let source_store = Storage::new(&storage_config, &source.bucket).await?;
        let target_store = Storage::new(&storage_config, &params.target_bucket).await?;
        let staging = params.staging();

        Ok(Self {
            params,
            source_store,
            target_store,
            staging,
        })
    }

    /// Run the configured phase to completion.
    pub async fn run(&self) -> Result<()> {
        self.staging.ensure_layout()?;

        match self.params.pipeline {
            PipelineMode::TransferSource => self.transfer_source().await,
            PipelineMode::GenerateBatchMetadataFiles => self.generate_batch_metadata().await,
            PipelineMode::RunBatchData => self.run_batch_data().await,
        }
    }

    async fn transfer_source(&self) -> Result<()> {
        let source = self.params.source()?;
        copy_source_archives(
            &self.source_store,
            &source.prefix,
            &self.target_store,
            &self.params.transfer_prefix(),
        )
        .await?;
        Ok(())
    }

    async fn generate_batch_metadata(&self) -> Result<()> {
        info!("Collecting list of files to process ...");
        let source = self.params.source()?;

        // Idempotent restart: reruns must not accumulate stale manifests
        // or load output.
        self.target_store
            .delete_all(&self.params.load_prefix())
            .await?;
        self.target_store
            .delete_all(&self.params.batch_prefix())
            .await?;

        let keys = self.source_store.list(&source.prefix).await?;
        let manifests = plan_batches(&keys, &source, self.params.batch_length);
        info!(
            "Planned {} batch manifests from {} listed objects",
            manifests.len(),
            keys.len()
        );

        for manifest in &manifests {
            let file_name = manifest.file_name();
            info!(
                "Generating metadata for batch {} ({} files)",
                manifest.number,
                manifest.records.len()
            );

            let local_path = self.staging.manifest_path(&file_name);
            manifest.write_to(&local_path)?;

            let key = format!("{}/{}", self.params.batch_prefix(), file_name);
            self.target_store.upload_file(&local_path, &key).await?;
        }

        Ok(())
    }

    async fn run_batch_data(&self) -> Result<()> {
        info!("Collecting list of batch metadata files to process ...");

        let mut manifest_keys = self.target_store.list(&self.params.batch_prefix()).await?;
        // Slot assignment must be identical across workers; pin the order
        // rather than trusting the store's listing.
        manifest_keys.sort();

        let assigned = select_assigned(
            &manifest_keys,
            self.params.batch_group_size,
            self.params.batch_ordinal,
        );
        info!(
            "Slot {}/{} assigned {} of {} manifests",
            self.params.batch_ordinal,
            self.params.batch_group_size,
            assigned.len(),
            manifest_keys.len()
        );

        let processor = BatchProcessor::new(
            &self.source_store,
            &self.target_store,
            &self.staging,
            self.params.load_prefix(),
        );
        for key in &assigned {
            processor.process_manifest(key).await?;
        }

        Ok(())
    }
}
