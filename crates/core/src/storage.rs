//! Blob storage for task attachments.
//!
//! The database only records attachment metadata; bytes go through an
//! [`AttachmentStore`]. Writing is two-phase so the metadata transaction can
//! decide whether a file survives:
//!
//! 1. [`stage`](AttachmentStore::stage) writes the upload to a temporary area.
//! 2. [`promote`](AttachmentStore::promote) moves it to its final key while the
//!    task row is locked.
//! 3. [`discard`](AttachmentStore::discard) removes a staged copy on any
//!    failure path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Original file name supplied by the client.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Handle to a file written to the staging area but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub staging_key: String,
    pub size: u64,
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Write the upload to the staging area.
    async fn stage(&self, upload: &FileUpload) -> Result<StagedFile, StorageError>;

    /// Move a staged file to its final key.
    async fn promote(&self, staged: &StagedFile, key: &str) -> Result<(), StorageError>;

    /// Remove a staged file. A file that is already gone is not an error.
    async fn discard(&self, staged: &StagedFile) -> Result<(), StorageError>;

    /// Remove a committed file. A file that is already gone is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public retrieval URL for a committed key.
    fn url(&self, key: &str) -> String;
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

/// Reduce a client-supplied name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `-`. An empty result falls back to `file`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Display name of an attachment: the file name without its extension.
pub fn display_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Final storage key for an attachment of `task_id`.
pub fn attachment_key(task_id: crate::types::DbId, file_name: &str) -> String {
    format!("tasks/{task_id}/{}/{file_name}", Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Local filesystem store
// ---------------------------------------------------------------------------

const STAGING_DIR: &str = ".staging";

/// Stores attachments under a root directory; staging lives in `<root>/.staging`.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalAttachmentStore {
    /// `public_base_url` is the URL prefix the root directory is served under,
    /// e.g. `http://localhost:3000/storage`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let traverses = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if key.is_empty() || traverses {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn stage(&self, upload: &FileUpload) -> Result<StagedFile, StorageError> {
        let staging_key = format!("{STAGING_DIR}/{}", Uuid::new_v4());
        let path = self.resolve(&staging_key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &upload.bytes).await?;
        Ok(StagedFile {
            staging_key,
            size: upload.bytes.len() as u64,
        })
    }

    async fn promote(&self, staged: &StagedFile, key: &str) -> Result<(), StorageError> {
        let from = self.resolve(&staged.staging_key)?;
        let to = self.resolve(key)?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&from, &to).await?;
        Ok(())
    }

    async fn discard(&self, staged: &StagedFile) -> Result<(), StorageError> {
        remove_if_exists(&self.resolve(&staged.staging_key)?).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        remove_if_exists(&self.resolve(key)?).await
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
