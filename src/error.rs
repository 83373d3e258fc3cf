use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Authorization(String),
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
    #[error("Challenge rendering failed: {0}")]
    Render(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors the user can act on get their own message; everything else is
    /// reported as a generic failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_) | EngineError::NotFound(_) | EngineError::Authorization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
