use thiserror::Error;

use crate::api::ApiError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Failed to parse config file: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
