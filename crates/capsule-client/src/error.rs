use capsule_store::StoreError;
use thiserror::Error;

/// Input rejected before any remote call was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Post text is empty")]
    EmptyText,

    #[error("Folder name is empty")]
    EmptyName,

    #[error("No folder is open")]
    NoFolderOpen,

    #[error("File is empty")]
    EmptyFile,
}

/// Failure of a content sync operation.  In every case the in-memory
/// content is left as it was before the call.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download returned status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not save file: {0}")]
    Persist(#[from] tempfile::PersistError),
}
