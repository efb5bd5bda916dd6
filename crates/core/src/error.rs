use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
