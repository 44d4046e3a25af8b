//! Bulk copy of raw source archives into the staging bucket
//!
//! Server-side copies through the storage adapter; objects already present
//! at the destination are skipped, so reruns only move what is missing.

use super::{Result, ARCHIVE_SUFFIX};
use crate::storage::{object_basename, Storage};
use tracing::{debug, info};

/// Copy every archive from the source location into the destination prefix
/// of the target bucket. Returns the number of objects copied (skipped
/// objects not included).
pub async fn copy_source_archives(
    source_store: &Storage,
    source_prefix: &str,
    target_store: &Storage,
    destination_prefix: &str,
) -> Result<usize> {
    info!(
        "Copying archives from s3://{}/{} to s3://{}/{}",
        source_store.bucket(),
        source_prefix,
        target_store.bucket(),
        destination_prefix
    );

    let keys = source_store.list(source_prefix).await?;
    let mut copied = 0usize;

    for key in keys
        .iter()
        .filter(|key| object_basename(key).contains(ARCHIVE_SUFFIX))
    {
        let dest_key = format!("{}/{}", destination_prefix, object_basename(key));

        if target_store.exists(&dest_key).await? {
            debug!("Skipping {} (already copied)", dest_key);
            continue;
        }

        target_store
            .copy_from_bucket(source_store.bucket(), key, &dest_key)
            .await?;
        copied += 1;
    }

    info!("Copied {} archives ({} listed)", copied, keys.len());

    Ok(copied)
}
