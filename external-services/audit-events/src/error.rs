use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event publish failed: {0}")]
    PublishFailure(String),

    #[error("Event sink connection failed: {0}")]
    Connect(String),

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown event backend '{0}'")]
    UnknownBackend(String),
}

pub type EventResult<T> = Result<T, EventError>;
