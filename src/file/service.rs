//! Hierarchy service for treevault.
//!
//! This module ties the metadata store and the blob store together:
//! - Directory creation with a matching storage folder
//! - File placement (blob first, then record) and deletion (blob first, then record)
//! - Bounded-depth tree listings and path flattening
//! - Blob state checks for records whose bytes went missing or changed

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::config::{Config, TreeConfig};
use crate::db::Database;
use crate::{Result, VaultError};

use super::directory::{Directory, DirectoryRepository, NewDirectory};
use super::metadata::{File, FileRepository, NewFile};
use super::path;
use super::storage::BlobStore;
use super::tree::{DirectoryArena, DirectoryNode};
use super::{DEFAULT_MAX_FILE_SIZE, MAX_NAME_LENGTH};

/// An opened file ready to be streamed.
#[derive(Debug)]
pub struct Download {
    /// File metadata.
    pub file: File,
    /// Open handle on the blob.
    pub reader: tokio::fs::File,
}

impl Download {
    /// Read the whole blob into memory.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut content = Vec::with_capacity(usize::try_from(self.file.size).unwrap_or(0));
        self.reader.read_to_end(&mut content).await?;
        Ok(content)
    }
}

/// Agreement between a file record and its blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// The blob exists and matches the recorded size and checksum.
    Placed,
    /// The record exists but the blob does not.
    BlobMissing,
    /// The blob exists but its size or checksum differs from the record.
    Corrupt,
}

/// Service owning the mapping between directory records and stored bytes.
#[derive(Debug, Clone)]
pub struct HierarchyService {
    db: Database,
    storage: BlobStore,
    tree: TreeConfig,
    max_file_size: u64,
}

impl HierarchyService {
    /// Create a new HierarchyService.
    pub fn new(db: Database, storage: BlobStore, tree: TreeConfig) -> Self {
        Self {
            db,
            storage,
            tree,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the maximum accepted file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Open the database and blob root named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path).await?;
        let storage = BlobStore::new(&config.storage.root)?;

        Ok(Self::new(db, storage, config.tree).with_max_file_size(config.storage.max_upload_bytes))
    }

    /// Get the database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Get the blob store.
    pub fn storage(&self) -> &BlobStore {
        &self.storage
    }

    /// Get the tree limits.
    pub fn tree_config(&self) -> TreeConfig {
        self.tree
    }

    /// Get the maximum accepted file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Create a directory under `parent_id` (top level if `None`).
    ///
    /// # Validation
    /// - Name: non-blank, max 255 characters (surrounding whitespace is trimmed)
    /// - Parent: must exist
    /// - Depth: at most `tree.max_depth` levels
    ///
    /// The storage folder is created after the record. A failure there is
    /// logged and does not fail the call; the folder is created again on
    /// the first placement into the directory.
    pub async fn create_directory(&self, name: &str, parent_id: Option<i64>) -> Result<Directory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::BadRequest(
                "directory name is required".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(VaultError::BadRequest(format!(
                "directory name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        let repo = DirectoryRepository::new(self.db.pool());
        let mut chain = match parent_id {
            Some(id) => repo.get_path(id).await?,
            None => Vec::new(),
        };
        if chain.len() >= self.tree.max_depth {
            return Err(VaultError::BadRequest(format!(
                "directories can be nested at most {} levels deep",
                self.tree.max_depth
            )));
        }

        let mut new_directory = NewDirectory::new(name);
        new_directory.parent_id = parent_id;
        let directory = repo.create(&new_directory).await?;

        chain.push(directory.clone());
        let folder = path::directory_path(&chain);
        if let Err(e) = self.storage.create_dir(&folder).await {
            warn!(
                "Directory {} created but storage folder {} failed: {}",
                directory.id, folder, e
            );
        }

        info!(
            "Created directory {} ({})",
            directory.id,
            path::display_path(&chain, None)
        );
        Ok(directory)
    }

    /// Store the bytes of `source` as a new file in `directory_id` (root level if `None`).
    ///
    /// # Validation
    /// - Name: must sanitize to a usable path segment of at most 255 bytes
    /// - Directory: must exist
    /// - Size: at most the configured maximum
    ///
    /// An existing blob at the derived storage path is never replaced; the
    /// second placement fails with `Conflict`. If the record cannot be
    /// written the blob is removed again.
    pub async fn place_file<R>(
        &self,
        source: R,
        original_name: &str,
        directory_id: Option<i64>,
        mime_type: Option<&str>,
    ) -> Result<File>
    where
        R: AsyncRead + Unpin,
    {
        let leaf = path::storage_leaf(original_name)
            .ok_or_else(|| VaultError::BadRequest("file name is required".to_string()))?;
        if leaf.len() > MAX_NAME_LENGTH {
            return Err(VaultError::BadRequest(format!(
                "file name must be at most {MAX_NAME_LENGTH} bytes"
            )));
        }

        let chain = match directory_id {
            Some(id) => {
                DirectoryRepository::new(self.db.pool())
                    .get_path(id)
                    .await?
            }
            None => Vec::new(),
        };
        let storage_path = path::storage_path(&chain, &leaf);

        let digest = self
            .storage
            .write_new(&storage_path, source, self.max_file_size)
            .await?;

        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(original_name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let new_file = NewFile {
            original_name: original_name.to_string(),
            storage_path: storage_path.clone(),
            mime_type,
            size: digest.size as i64,
            checksum: digest.checksum,
            directory_id,
        };

        match FileRepository::new(self.db.pool()).create(&new_file).await {
            Ok(file) => {
                info!(
                    "Placed file {} at {} ({} bytes)",
                    file.id, file.storage_path, file.size
                );
                Ok(file)
            }
            Err(e) => {
                self.discard_placement(&storage_path, &chain, &e).await;
                Err(e)
            }
        }
    }

    /// Undo the blob write of a placement whose record insert failed.
    ///
    /// If the directory was deleted meanwhile, the write recreated its
    /// storage folder; remove it again when it is empty.
    async fn discard_placement(&self, storage_path: &str, chain: &[Directory], err: &VaultError) {
        if let Err(cleanup) = self.storage.delete(storage_path).await {
            warn!(
                "Failed to remove blob {} after record insert failed: {}",
                storage_path, cleanup
            );
        }

        if chain.is_empty() || !matches!(err, VaultError::NotFound(_)) {
            return;
        }
        let folder = path::directory_path(chain);
        match self.storage.remove_dir(&folder).await {
            Ok(true) => debug!("Removed storage folder {} of a deleted directory", folder),
            Ok(false) => {}
            Err(e) => debug!("Left storage folder {} in place: {}", folder, e),
        }
    }

    /// Top-level directories in creation order, expanded to the listing depth.
    pub async fn get_top_level(&self) -> Result<Vec<DirectoryNode>> {
        let roots = DirectoryRepository::new(self.db.pool())
            .list_root()
            .await?;
        let ids: Vec<i64> = roots.iter().map(|d| d.id).collect();

        let (arena, files) = self.load_levels(roots).await?;

        Ok(ids
            .into_iter()
            .filter_map(|id| arena.assemble(id, &files, self.tree.listing_depth))
            .collect())
    }

    /// One directory expanded to the listing depth.
    pub async fn get_subtree(&self, id: i64) -> Result<DirectoryNode> {
        let directory = DirectoryRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("directory {id}")))?;

        let (arena, files) = self.load_levels(vec![directory]).await?;

        arena
            .assemble(id, &files, self.tree.listing_depth)
            .ok_or_else(|| VaultError::NotFound(format!("directory {id}")))
    }

    /// Load `start` plus `listing_depth` levels of descendants, and the
    /// files of every directory that will be expanded.
    async fn load_levels(
        &self,
        start: Vec<Directory>,
    ) -> Result<(DirectoryArena, HashMap<i64, Vec<File>>)> {
        let directories = DirectoryRepository::new(self.db.pool());

        let mut seen: HashSet<i64> = start.iter().map(|d| d.id).collect();
        let mut frontier: Vec<i64> = start.iter().map(|d| d.id).collect();
        let mut loaded = start;
        let mut expanded = Vec::new();

        for _ in 0..self.tree.listing_depth {
            if frontier.is_empty() {
                break;
            }
            expanded.extend_from_slice(&frontier);

            let mut next = Vec::new();
            for child in directories.list_by_parents(&frontier).await? {
                if seen.insert(child.id) {
                    next.push(child.id);
                    loaded.push(child);
                }
            }
            frontier = next;
        }

        let mut files: HashMap<i64, Vec<File>> = HashMap::new();
        for file in FileRepository::new(self.db.pool())
            .list_by_directories(&expanded)
            .await?
        {
            if let Some(directory_id) = file.directory_id {
                files.entry(directory_id).or_default().push(file);
            }
        }

        debug!(
            "Loaded {} directories and {} expanded for listing",
            loaded.len(),
            expanded.len()
        );
        Ok((DirectoryArena::new(loaded), files))
    }

    /// Every directory as `(id, "name/name/...")`, depth-first, siblings in
    /// creation order.
    pub async fn flatten_to_paths(&self) -> Result<Vec<(i64, String)>> {
        let arena = DirectoryArena::new(
            DirectoryRepository::new(self.db.pool())
                .list_all()
                .await?,
        );

        let paths = arena.flatten();
        if paths.len() < arena.len() {
            warn!(
                "{} directories are not reachable from the top level",
                arena.len() - paths.len()
            );
        }

        Ok(paths)
    }

    /// All files, newest first.
    pub async fn list_files(&self) -> Result<Vec<File>> {
        FileRepository::new(self.db.pool()).list_all().await
    }

    /// Get a file record.
    pub async fn get_file(&self, id: i64) -> Result<File> {
        FileRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("file {id}")))
    }

    /// Open a file for download.
    ///
    /// `NotFound` if there is no record; `Gone` if the record exists but its
    /// blob does not.
    pub async fn download_file(&self, id: i64) -> Result<Download> {
        let file = self.get_file(id).await?;

        match self.storage.open(&file.storage_path).await? {
            Some(reader) => Ok(Download { file, reader }),
            None => {
                warn!(
                    "File {} has a record but no blob at {}",
                    file.id, file.storage_path
                );
                Err(VaultError::Gone(format!("file {id}")))
            }
        }
    }

    /// Delete a file: blob first, then record.
    pub async fn delete_file(&self, id: i64) -> Result<()> {
        let file = self.get_file(id).await?;

        if !self.storage.delete(&file.storage_path).await? {
            debug!(
                "Blob {} for file {} was already absent",
                file.storage_path, file.id
            );
        }

        if !FileRepository::new(self.db.pool()).delete(id).await? {
            return Err(VaultError::NotFound(format!("file {id}")));
        }

        info!("Deleted file {} ({})", file.id, file.storage_path);
        Ok(())
    }

    /// Compare a file record against its blob.
    pub async fn file_state(&self, id: i64) -> Result<FileState> {
        let file = self.get_file(id).await?;

        let state = match self.storage.digest(&file.storage_path).await? {
            None => FileState::BlobMissing,
            Some(digest) if digest.size as i64 == file.size && digest.checksum == file.checksum => {
                FileState::Placed
            }
            Some(_) => FileState::Corrupt,
        };

        Ok(state)
    }

    /// Delete an empty directory and its storage folder.
    ///
    /// `Conflict` if it still has child directories or files, or if stray
    /// bytes remain in its storage folder.
    pub async fn delete_directory(&self, id: i64) -> Result<()> {
        let directories = DirectoryRepository::new(self.db.pool());
        let chain = directories.get_path(id).await?;

        if directories.count_children(id).await? > 0 {
            return Err(VaultError::Conflict(format!(
                "directory {id} still has subdirectories"
            )));
        }
        if FileRepository::new(self.db.pool())
            .count_by_directory(id)
            .await?
            > 0
        {
            return Err(VaultError::Conflict(format!(
                "directory {id} still has files"
            )));
        }

        let folder = path::directory_path(&chain);
        if !self.storage.remove_dir(&folder).await? {
            debug!("Storage folder {} for directory {} was already absent", folder, id);
        }

        if !directories.delete(id).await? {
            return Err(VaultError::NotFound(format!("directory {id}")));
        }

        info!("Deleted directory {} ({})", id, path::display_path(&chain, None));
        Ok(())
    }
}
