mod json_file;

use async_trait::async_trait;
pub use json_file::JsonFileStore;
use mockall::automock;
use thiserror::Error;

/// Errors from reading or writing the seen-set.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("Seen-set file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file holds something other than a list of ids.
    #[error("Seen-set file is not a JSON array of strings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for seen-set operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The set of record ids that were already announced.
#[automock]
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Returns true if the id has not been announced yet.
    async fn is_new(&self, id: &str) -> bool;

    /// Records the id as announced and persists the set.
    ///
    /// On error the id is still remembered in memory for the rest of the
    /// process lifetime.
    async fn mark_sent(&self, id: &str) -> StorageResult<()>;
}
