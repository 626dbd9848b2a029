use thiserror::Error;

#[derive(Error, Debug)]
pub enum NRError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Incompatible lengths: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Precondition violated: {0}")]
    PreconditionViolated(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type NRResult<T> = Result<T, NRError>;
