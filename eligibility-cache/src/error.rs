use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown cache backend '{0}'")]
    UnknownBackend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
