use crate::models::GeneratedImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IconError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to save history record: {0}")]
    WriteFailed(String),

    #[error("Failed to read history: {0}")]
    ReadFailed(String),

    #[error("Failed to delete history record: {0}")]
    DeleteFailed(String),

    #[error("Failed to clear history: {0}")]
    ClearFailed(String),

    /// The image was generated but its history record could not be saved.
    /// Carries the unsaved record.
    #[error("Image generated but not saved to history: {source}")]
    PersistenceFailed {
        record: Box<GeneratedImage>,
        #[source]
        source: Box<IconError>,
    },

    #[error("Another generation is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    GenerationFailed,
    StorageUnavailable,
    WriteFailed,
    ReadFailed,
    DeleteFailed,
    ClearFailed,
    PersistenceFailed,
    Busy,
    Config,
    Request,
    Response,
    Serialization,
    Download,
}

impl IconError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IconError::InvalidInput(_) => ErrorKind::InvalidInput,
            IconError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            IconError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            IconError::WriteFailed(_) => ErrorKind::WriteFailed,
            IconError::ReadFailed(_) => ErrorKind::ReadFailed,
            IconError::DeleteFailed(_) => ErrorKind::DeleteFailed,
            IconError::ClearFailed(_) => ErrorKind::ClearFailed,
            IconError::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            IconError::Busy => ErrorKind::Busy,
            IconError::ConfigError(_) => ErrorKind::Config,
            IconError::RequestError(_) => ErrorKind::Request,
            IconError::ResponseError(_) => ErrorKind::Response,
            IconError::SerializationError(_) => ErrorKind::Serialization,
            IconError::DownloadFailed(_) => ErrorKind::Download,
        }
    }

    /// The generated record when this is a `PersistenceFailed` error.
    pub fn record(&self) -> Option<&GeneratedImage> {
        match self {
            IconError::PersistenceFailed { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<GeneratedImage> {
        match self {
            IconError::PersistenceFailed { record, .. } => Some(*record),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IconError>;
