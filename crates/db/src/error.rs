use taskboard_core::error::CoreError;
use taskboard_core::storage::StorageError;

/// Error returned by repositories that go beyond plain row access.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A domain-level error (e.g. the target row does not exist).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The blob store failed while staging, promoting or removing a file.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }
}
