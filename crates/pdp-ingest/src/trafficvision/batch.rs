//! Batch-group processing
//!
//! One invocation owns one worker slot: manifests are assigned cyclically
//! to slots `1..=batch_group_size` over the sorted manifest listing, and
//! only those matching this invocation's `batch_ordinal` are processed.
//! Records inside a manifest are handled strictly sequentially; the first
//! failing record aborts the invocation and the top-level retry re-runs
//! the phase.

use super::manifest::{read_manifest, ManifestRecord};
use super::staging::StagingArea;
use super::transform::rewrite_log_file;
use super::{Result, TrafficVisionError};
use crate::storage::{object_basename, ObjectUrl, Storage};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Select the manifest keys assigned to `batch_ordinal`.
///
/// Keys must already be sorted; slots cycle `1..=batch_group_size` in key
/// order, so the selections for distinct ordinals partition the listing.
pub fn select_assigned(
    manifest_keys: &[String],
    batch_group_size: u32,
    batch_ordinal: u32,
) -> Vec<String> {
    manifest_keys
        .iter()
        .enumerate()
        .filter(|(index, _)| (*index as u32 % batch_group_size.max(1)) + 1 == batch_ordinal)
        .map(|(_, key)| key.clone())
        .collect()
}

/// Unpack a `.tar.gz` archive into the destination directory.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    debug!(
        "Extracting {} into {}",
        archive_path.display(),
        destination.display()
    );

    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.unpack(destination).map_err(|e| {
        TrafficVisionError::Archive(format!(
            "failed to extract {}: {}",
            archive_path.display(),
            e
        ))
    })
}

/// Processes the manifests assigned to one worker slot.
pub struct BatchProcessor<'a> {
    source_store: &'a Storage,
    target_store: &'a Storage,
    staging: &'a StagingArea,
    load_prefix: String,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        source_store: &'a Storage,
        target_store: &'a Storage,
        staging: &'a StagingArea,
        load_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_store,
            target_store,
            staging,
            load_prefix: load_prefix.into(),
        }
    }

    /// Download one manifest, process every record in it, then drop the
    /// local manifest copy.
    pub async fn process_manifest(&self, manifest_key: &str) -> Result<()> {
        info!("Processing batch manifest {}", manifest_key);

        let file_name = object_basename(manifest_key).to_string();
        let local_manifest = self.staging.manifest_path(&file_name);
        self.target_store
            .download_to_file(manifest_key, &local_manifest)
            .await?;

        let records = read_manifest(&local_manifest)?;
        info!("Manifest {} lists {} archives", file_name, records.len());

        for record in &records {
            self.process_record(record).await?;
        }

        // One deletion for the whole manifest, after the last record.
        std::fs::remove_file(&local_manifest)?;

        Ok(())
    }

    /// Download, unpack, rewrite, upload, and clean up a single archive.
    async fn process_record(&self, record: &ManifestRecord) -> Result<()> {
        let object = ObjectUrl::parse(&record.pathname)
            .map_err(|e| TrafficVisionError::Manifest(e.to_string()))?;
        if object.bucket != self.source_store.bucket() {
            return Err(TrafficVisionError::Validation(format!(
                "manifest record {} references bucket {}, expected {}",
                record.guid,
                object.bucket,
                self.source_store.bucket()
            )));
        }

        debug!("Processing archive {} (batch {})", record.guid, record.batch_number);

        let archive_key = object.prefix.as_str();
        let file_name = object_basename(archive_key).to_string();
        let archive_path = self.staging.archive_path(&file_name);
        self.source_store
            .download_to_file(archive_key, &archive_path)
            .await?;

        extract_archive(&archive_path, self.staging.unpack_dir())?;

        let extracted_log = self.staging.unpacked_log(&record.guid);
        if !extracted_log.is_file() {
            return Err(TrafficVisionError::Archive(format!(
                "archive {} did not contain {}/{}",
                file_name,
                record.guid,
                super::ARCHIVE_LOG_NAME
            )));
        }

        let load_path = self.staging.load_path(&record.guid);
        rewrite_log_file(&extracted_log, &load_path, &record.guid)?;

        let dest_key = format!("{}/out{}.log", self.load_prefix, record.guid);
        self.target_store.upload_file(&load_path, &dest_key).await?;

        // Staging artifacts are transient; drop all three unconditionally
        // once the record is done.
        std::fs::remove_file(&archive_path)?;
        std::fs::remove_file(&load_path)?;
        std::fs::remove_dir_all(self.staging.unpacked_dir(&record.guid))?;

        Ok(())
    }
}
