//! Local staging area for transient pipeline artifacts
//!
//! One invocation owns one staging root with four fixed subfolders:
//! downloaded archives (source), extracted trees (unpack), rewritten logs
//! ready for upload (load), and local manifest copies (batch). Layout
//! creation is idempotent; stale contents from a prior run are the caller's
//! concern.

use super::{Result, ARCHIVE_LOG_NAME};
use std::path::{Path, PathBuf};
use tracing::info;

/// Deterministic local directory hierarchy for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    source_dir: PathBuf,
    unpack_dir: PathBuf,
    load_dir: PathBuf,
    batch_dir: PathBuf,
}

impl StagingArea {
    pub fn new(
        root: impl Into<PathBuf>,
        source_folder: &str,
        unpack_folder: &str,
        load_folder: &str,
        batch_folder: &str,
    ) -> Self {
        let root = root.into();
        Self {
            source_dir: root.join(source_folder),
            unpack_dir: root.join(unpack_folder),
            load_dir: root.join(load_folder),
            batch_dir: root.join(batch_folder),
            root,
        }
    }

    /// Create the root and all four subfolders if absent.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            &self.root,
            &self.source_dir,
            &self.unpack_dir,
            &self.load_dir,
            &self.batch_dir,
        ] {
            if !dir.exists() {
                info!("Creating folder {}", dir.display());
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn unpack_dir(&self) -> &Path {
        &self.unpack_dir
    }

    pub fn load_dir(&self) -> &Path {
        &self.load_dir
    }

    pub fn batch_dir(&self) -> &Path {
        &self.batch_dir
    }

    /// Local path for a downloaded archive.
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.source_dir.join(file_name)
    }

    /// Directory an archive for `guid` unpacks into.
    pub fn unpacked_dir(&self, guid: &str) -> PathBuf {
        self.unpack_dir.join(guid)
    }

    /// Log file expected inside an unpacked archive.
    pub fn unpacked_log(&self, guid: &str) -> PathBuf {
        self.unpacked_dir(guid).join(ARCHIVE_LOG_NAME)
    }

    /// Rewritten output file staged for upload.
    pub fn load_path(&self, guid: &str) -> PathBuf {
        self.load_dir.join(format!("out{}.log", guid))
    }

    /// Local copy of a downloaded batch manifest.
    pub fn manifest_path(&self, file_name: &str) -> PathBuf {
        self.batch_dir.join(file_name)
    }
}
