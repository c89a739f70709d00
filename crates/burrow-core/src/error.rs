use crate::shortcode::ShortCode;
use thiserror::Error;

/// Errors related to the core types of the URL shortener service.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("short code is empty")]
    EmptyShortCode,
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors returned by [`Repository`](crate::Repository) implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("original url is empty")]
    EmptyUrl,
    #[error("short code is empty")]
    EmptyCode,
    #[error("owner id is empty")]
    EmptyOwner,
    #[error("short code already used: {0}")]
    CodeAlreadyUsed(ShortCode),
    #[error("url {original_url} already shortened as {existing}")]
    UrlConflict {
        original_url: String,
        existing: ShortCode,
    },
    #[error("short code not found: {0}")]
    NotFound(ShortCode),
    #[error("short code deleted: {0}")]
    Gone(ShortCode),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// Errors returned by [`Shortener`](crate::Shortener) implementations.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("original url is empty")]
    EmptyUrl,
    #[error("short code is empty")]
    EmptyShortCode,
    #[error("owner id is empty")]
    EmptyOwner,
    #[error("batch is empty")]
    EmptyBatch,
    #[error("correlation id is empty")]
    EmptyCorrelationId,
    #[error("failed to generate a free short code after {attempts} attempts")]
    FailedToGenerate { attempts: u32 },
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code deleted: {0}")]
    Gone(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::EmptyShortCode => Self::EmptyShortCode,
            CoreError::InvalidShortCode(code) => Self::NotFound(code),
        }
    }
}
