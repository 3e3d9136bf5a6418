//! Content-addressed cache for downloaded document files
//!
//! Files are keyed by the SHA-256 of their bytes and laid out in a two-level
//! directory structure, e.g. hash "abcd1234..." lives at "files/ab/cd/abcd1234...".
//! Writing the same bytes twice stores them once.

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// On-disk cache of downloaded files
#[derive(Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the cache directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("File cache initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store bytes, returning their hash
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        let hash = content_hash(data);
        let path = self.path_for(&hash)?;

        if fs::try_exists(&path).await? {
            tracing::debug!("Cached file already present: {}", hash);
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Temp file + rename so readers never see a partial file.
        // Each writer gets its own temp file; identical bytes may race here.
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        tracing::debug!("Cached file: {} ({} bytes)", hash, data.len());

        Ok(hash)
    }

    /// Location of a cached file, for handing to an external viewer
    pub fn path_for(&self, hash: &str) -> Result<PathBuf> {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::Validation(format!("Invalid file hash: {}", hash)));
        }
        Ok(self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
