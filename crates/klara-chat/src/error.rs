use thiserror::Error;

use klara_cache::CacheError;
use klara_persist::PersistError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid required fields: {0}")]
    InvalidRequest(String),

    #[error("Duplicate request, please wait before retrying")]
    DuplicateRequest,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] PersistError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
