use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal cache error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
