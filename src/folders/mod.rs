//! Metadata-Folder Store Abstraction
//!
//! Virtual folders are owned by an external document store; this layer only
//! reads them and requests deletion by id. The abstraction keeps the rest of
//! the system independent of the concrete backend: SQLite in production,
//! an in-memory mock in tests.

pub mod mock_store;
pub mod sqlite_store;

use crate::error::StoreError;

/// A metadata folder in the external hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
    /// Materialized path of folder names, joined with `/`
    pub path: String,
}

pub type FolderResult<T> = Result<T, StoreError>;

/// Trait defining the metadata-folder store interface
pub trait FolderStore: Send + Sync {
    /// Load a folder by id
    fn folder(&self, id: i64) -> FolderResult<Option<Folder>>;

    /// Load a folder by its materialized path
    fn folder_by_path(&self, path: &str) -> FolderResult<Option<Folder>>;

    /// Number of direct child folders
    fn child_folder_count(&self, id: i64) -> FolderResult<u64>;

    /// Number of file records under a folder path, excluding one hash
    fn file_count_in_folder(&self, path: &str, exclude_hash: &str) -> FolderResult<u64>;

    /// Delete a folder record by id
    fn delete_folder(&self, id: i64) -> FolderResult<()>;

    /// The folder id a file record currently points at, if any
    fn folder_of_file(&self, hash: &str) -> FolderResult<Option<i64>>;

    /// Create any missing folders along `segments` and return the deepest one.
    /// Returns `None` for an empty segment list.
    fn ensure_path(&self, segments: &[String]) -> FolderResult<Option<Folder>>;

    /// Record that a file lives under a folder path
    fn record_file(&self, hash: &str, folder_path: &str) -> FolderResult<()>;

    /// Remove the file record for a hash
    fn forget_file(&self, hash: &str) -> FolderResult<()>;
}
