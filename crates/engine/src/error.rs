// FILE: crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Audio context unavailable: {0}")]
    AudioContextUnavailable(String),

    #[error("Audio graph already stopped")]
    AlreadyStopped,

    #[error("Resample error: {0}")]
    Resample(String),

    #[error("Preview provider error: {0}")]
    Provider(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Failures that only mean "the resource was already gone"
    pub fn is_benign(&self) -> bool {
        matches!(self, EngineError::AlreadyStopped)
    }
}

impl From<EngineError> for audioshelf_core::AppError {
    fn from(err: EngineError) -> Self {
        use audioshelf_core::AppError;
        match err {
            EngineError::Decode(message) => AppError::AudioDecodeError {
                message,
                source: None,
            },
            EngineError::Output(message) | EngineError::AudioContextUnavailable(message) => {
                AppError::PlaybackDeviceError { message }
            }
            EngineError::Provider(message) => AppError::ProviderError {
                message,
                source: None,
            },
            EngineError::Io(e) => AppError::from(e),
            other => AppError::InternalError {
                message: other.to_string(),
            },
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
