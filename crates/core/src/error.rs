//! Error types for Audioshelf
//!
//! Errors are classified into three severity tiers:
//! - **Recoverable**: the provider may succeed on another attempt
//! - **Degraded**: the feature is disabled but the session continues
//! - **Fatal**: requires user intervention (unreadable catalog file)

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but app can continue
    Degraded,
    /// Critical error requiring user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for Audioshelf
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Catalog Errors =====
    /// Book not present in the catalog
    #[error("Book not found: {id}")]
    BookNotFound { id: String },

    /// A book with the same id is already in the catalog
    #[error("Duplicate book id: {id}")]
    DuplicateBook { id: String },

    /// Catalog file could not be parsed
    #[error("Catalog parse error in {path}: {reason}")]
    CatalogParse { path: PathBuf, reason: String },

    /// Book record failed validation
    #[error("Invalid book '{title}': {reason}")]
    InvalidBook { title: String, reason: String },

    // ===== Playback Errors =====
    /// Audio output is not available on this machine
    #[error("Playback device error: {message}")]
    PlaybackDeviceError { message: String },

    /// Preview audio could not be decoded
    #[error("Audio decode error: {message}")]
    AudioDecodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Provider Errors =====
    /// Remote narration provider failed
    #[error("Provider error: {message}")]
    ProviderError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== File System Errors =====
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    // ===== Generic Errors =====
    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ProviderError { .. } => ErrorSeverity::Recoverable,

            Self::PlaybackDeviceError { .. }
            | Self::AudioDecodeError { .. }
            | Self::BookNotFound { .. }
            | Self::DuplicateBook { .. }
            | Self::InvalidBook { .. }
            | Self::InternalError { .. } => ErrorSeverity::Degraded,

            Self::CatalogParse { .. } | Self::FileNotFound { .. } | Self::IoError { .. } => {
                ErrorSeverity::Fatal
            }
        }
    }

    /// Returns a user-friendly message suitable for the player UI
    pub fn user_message(&self) -> String {
        match self {
            Self::BookNotFound { id } => format!("No book with id '{}'.", id),
            Self::DuplicateBook { .. } => "That book is already in your library.".to_string(),
            Self::CatalogParse { .. } => {
                "The library file is damaged and could not be read.".to_string()
            }
            Self::InvalidBook { title, .. } => {
                format!("'{}' has invalid details and was not imported.", title)
            }
            Self::PlaybackDeviceError { .. } => {
                "Cannot access audio playback. Please check your sound settings.".to_string()
            }
            Self::AudioDecodeError { .. } | Self::ProviderError { .. } => {
                "Could not generate audio preview. Check API Key.".to_string()
            }
            Self::FileNotFound { .. } => {
                "The file was not found. It may have been moved or deleted.".to_string()
            }
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound {
                path: PathBuf::from("unknown"),
            },
            _ => Self::IoError {
                message: err.to_string(),
                source: err,
            },
        }
    }
}
