//! S3-compatible object store adapter
//!
//! Thin wrapper over `aws-sdk-s3` bound to a single bucket. Operations carry
//! no retry of their own; transient failures propagate to the caller and are
//! retried at the pipeline level (see [`crate::retry`]).

use anyhow::{anyhow, bail, Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use pdp_common::checksum::{compute_file_checksum, ChecksumAlgorithm};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};

pub mod config;

pub use config::StorageConfig;

/// Handle to one bucket of the object store.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(config: &StorageConfig, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        debug!("Initializing storage for bucket {}: {:?}", bucket, config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "pdp-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Storage client initialized for bucket: {}", bucket);

        Ok(Self { client, bucket })
    }

    /// Bucket this handle is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List all object keys under a prefix.
    ///
    /// Follows continuation tokens, so listings larger than one page are
    /// returned in full. Keys come back in the store's listing order
    /// (lexicographic for S3).
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        debug!("Listing objects in s3://{}/{}", self.bucket, prefix);

        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request.send().await.context("Failed to list S3 objects")?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        debug!("Listed {} objects under s3://{}/{}", keys.len(), self.bucket, prefix);

        Ok(keys)
    }

    /// Download an object to a local file.
    #[instrument(skip(self))]
    pub async fn download_to_file(&self, key: &str, path: &Path) -> Result<()> {
        debug!("Downloading s3://{}/{} to {}", self.bucket, key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download from S3: {}", key))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes();

        tokio::fs::write(path, &data)
            .await
            .with_context(|| format!("Failed to write local file: {}", path.display()))?;

        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket,
            key
        );

        Ok(())
    }

    /// Upload a local file to an object key.
    #[instrument(skip(self))]
    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<UploadResult> {
        let checksum = compute_file_checksum(path, ChecksumAlgorithm::Sha256)
            .with_context(|| format!("Failed to checksum upload source: {}", path.display()))?;
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat upload source: {}", path.display()))?
            .len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open upload source: {}", path.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .context("Failed to upload to S3")?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    /// Delete every object under a prefix. Returns the number deleted.
    #[instrument(skip(self))]
    pub async fn delete_all(&self, prefix: &str) -> Result<usize> {
        info!("Removing objects under s3://{}/{}", self.bucket, prefix);

        let keys = self.list(prefix).await?;

        for key in &keys {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .with_context(|| format!("Failed to delete from S3: {}", key))?;
        }

        info!(
            "Deleted {} objects under s3://{}/{}",
            keys.len(),
            self.bucket,
            prefix
        );

        Ok(keys.len())
    }

    /// Check whether an object exists in this bucket.
    #[instrument(skip(self))]
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("404") {
                    Ok(false)
                } else {
                    Err(anyhow!("Failed to check S3 object existence: {}", e))
                }
            }
        }
    }

    /// Server-side copy of an object from another bucket into this one.
    #[instrument(skip(self))]
    pub async fn copy_from_bucket(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<()> {
        debug!(
            "Copying s3://{}/{} to s3://{}/{}",
            source_bucket, source_key, self.bucket, dest_key
        );

        let copy_source = format!("{}/{}", source_bucket, source_key);

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(&copy_source)
            .key(dest_key)
            .send()
            .await
            .with_context(|| format!("Failed to copy S3 object: {}", copy_source))?;

        Ok(())
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// Parsed `s3://bucket/prefix` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    pub bucket: String,
    pub prefix: String,
}

impl ObjectUrl {
    /// Parse an `s3://bucket/prefix` URL. The prefix may be empty; a
    /// trailing slash is dropped.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("s3://")
            .ok_or_else(|| anyhow!("Invalid object URL (expected s3://bucket/prefix): {}", url))?;

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            bail!("Invalid object URL (missing bucket): {}", url);
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Object key for a file name under this location's prefix.
    pub fn key_for(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }

    /// Full `s3://` URL for a file name under this location.
    pub fn url_for(&self, file_name: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.key_for(file_name))
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "s3://{}", self.bucket)
        } else {
            write!(f, "s3://{}/{}", self.bucket, self.prefix)
        }
    }
}

/// Final path segment of an object key.
pub fn object_basename(key: &str) -> &str {
    key.split('/').next_back().unwrap_or(key)
}
