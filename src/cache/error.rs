use std::time::Duration;

use thiserror::Error;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    #[error("cache call timed out after {0:?}")]
    TimeoutError(Duration),
    #[error("cache is unavailable")]
    Unavailable,
    #[error("operation against a key holding the wrong kind of value: {key}")]
    WrongType { key: String },
    #[error("malformed value at {key}: {value:?}")]
    Malformed { key: String, value: String },
}

impl CacheError {
    /// Anything except a malformed value means the store itself could not be
    /// reached or refused the call.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}
