//! Directory tree and file management for treevault.
//!
//! Directory and file records live in SQLite; file bytes live under a
//! blob root whose layout mirrors the directory tree by identifier:
//!
//! ```text
//! {root}/
//! ├── notes.txt             (root-level file)
//! ├── 1/                    (directory 1)
//! │   ├── a.txt
//! │   └── 4/                (directory 4, child of 1)
//! │       └── b.pdf
//! └── .staging/             (in-flight uploads)
//! ```

mod directory;
mod metadata;
pub mod path;
mod service;
mod storage;
mod tree;

pub use directory::{Directory, DirectoryRepository, NewDirectory};
pub use metadata::{File, FileRepository, NewFile};
pub use service::{Download, FileState, HierarchyService};
pub use storage::{BlobDigest, BlobStore};
pub use tree::{DirectoryArena, DirectoryNode};

/// Maximum length for directory names (in characters) and stored file
/// names (in bytes, the common filesystem limit).
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum number of directory levels.
pub const MAX_DIRECTORY_DEPTH: usize = 10;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of files accepted by a single upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;
