use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no extractable content in document")]
    NoContent,
    #[error("unknown session: {0}")]
    SessionNotFound(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
