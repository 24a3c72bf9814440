use thiserror::Error;

pub type PalisadeResult<T> = Result<T, PalisadeError>;

#[derive(Error, Debug)]
pub enum PalisadeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Blob '{0}' already exists (create-only store)")]
    BlobExists(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Component not enabled: {0}")]
    NotEnabled(String),

    #[error("{0}")]
    Other(String),
}
