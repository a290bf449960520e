use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
