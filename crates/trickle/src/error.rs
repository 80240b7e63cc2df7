use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] trickle_core::error::Error),
}
