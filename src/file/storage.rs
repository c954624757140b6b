//! Blob storage for treevault.
//!
//! Blobs are addressed by a relative storage path (segments separated by
//! `/`) under a single root. New blobs are first written to a staging
//! area and then hard-linked into place, so a blob path either holds the
//! complete bytes or does not exist, and an existing blob is never replaced.
//!
//! The staging area must be on the same filesystem as the blobs. Where the
//! filesystem has no hard links (some FUSE and SMB mounts), the target is
//! claimed with an exclusive create and the staged file is renamed over it;
//! a reader may then briefly see an empty blob.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Result, VaultError};

/// Name of the staging directory under the root.
const STAGING_DIR: &str = ".staging";

/// Copy buffer size for blob writes and digests.
const CHUNK_SIZE: usize = 64 * 1024;

/// Size and content hash of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobDigest {
    /// Number of bytes.
    pub size: u64,
    /// Lowercase hex SHA-256.
    pub checksum: String,
}

/// Filesystem-backed byte storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a BlobStore rooted at `root`.
    ///
    /// The root and its staging directory are created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR))?;

        Ok(Self { root })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative storage path to an absolute filesystem path.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Create the folder for `rel`. Succeeds if it already exists.
    pub async fn create_dir(&self, rel: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(rel)).await?;
        Ok(())
    }

    /// Remove the (empty) folder for `rel`.
    ///
    /// Returns `false` if it did not exist; a folder that still holds
    /// entries is a `Conflict`.
    pub async fn remove_dir(&self, rel: &str) -> Result<bool> {
        let path = self.resolve(rel);

        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if entries.next_entry().await?.is_some() {
            return Err(VaultError::Conflict(format!(
                "storage folder {rel} still has entries"
            )));
        }

        match fs::remove_dir(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a new blob at `rel` from `source`, reading it to the end.
    ///
    /// Fails with `Conflict` if a blob already exists at `rel`, and with
    /// `BadRequest` if the source is larger than `max_size`. On any failure
    /// nothing is left at `rel`.
    pub async fn write_new<R>(&self, rel: &str, source: R, max_size: u64) -> Result<BlobDigest>
    where
        R: AsyncRead + Unpin,
    {
        let target = self.resolve(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staged = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}.part", Uuid::new_v4()));

        let digest = match Self::stage(&staged, source, max_size).await {
            Ok(digest) => digest,
            Err(e) => {
                Self::discard(&staged).await;
                return Err(e);
            }
        };

        let linked = match fs::hard_link(&staged, &target).await {
            Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                debug!("Hard links unsupported under {:?}, renaming instead", self.root);
                Self::claim_and_rename(&staged, &target).await
            }
            other => other,
        };
        Self::discard(&staged).await;

        match linked {
            Ok(()) => Ok(digest),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(VaultError::Conflict(
                format!("storage path {rel} already exists"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Stream `source` into a fresh staging file, hashing as it goes.
    async fn stage<R>(path: &Path, mut source: R, max_size: u64) -> Result<BlobDigest>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if size > max_size {
                return Err(VaultError::BadRequest(format!(
                    "file exceeds the upload limit of {max_size} bytes"
                )));
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(BlobDigest {
            size,
            checksum: format!("{:x}", hasher.finalize()),
        })
    }

    /// Move `staged` to `target` without hard links. Fails with
    /// `AlreadyExists` if `target` is taken.
    async fn claim_and_rename(staged: &Path, target: &Path) -> io::Result<()> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .await?;

        if let Err(e) = fs::rename(staged, target).await {
            let _ = fs::remove_file(target).await;
            return Err(e);
        }
        Ok(())
    }

    async fn discard(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staging file {:?}: {}", path, e);
            }
        }
    }

    /// Open the blob at `rel` for reading, or `None` if it is absent.
    pub async fn open(&self, rel: &str) -> Result<Option<fs::File>> {
        match fs::File::open(self.resolve(rel)).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the blob at `rel`.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, rel: &str) -> Result<bool> {
        match fs::remove_file(self.resolve(rel)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists at `rel`.
    pub async fn exists(&self, rel: &str) -> bool {
        fs::metadata(self.resolve(rel))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Hash the blob at `rel`, or `None` if it is absent.
    pub async fn digest(&self, rel: &str) -> Result<Option<BlobDigest>> {
        let Some(mut file) = self.open(rel).await? else {
            return Ok(None);
        };

        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            size += n as u64;
            hasher.update(&buf[..n]);
        }

        Ok(Some(BlobDigest {
            size,
            checksum: format!("{:x}", hasher.finalize()),
        }))
    }
}
