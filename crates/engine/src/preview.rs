// crates/engine/src/preview.rs

use crate::decoder::EncodedAudio;
use crate::error::{EngineError, EngineResult};
use audioshelf_core::AppError;
use async_trait::async_trait;

/// Source of narrated preview audio
#[async_trait]
pub trait PreviewAudioProvider: Send + Sync {
    /// Returns encoded audio reading `text` aloud
    async fn request_preview_audio(&self, text: &str) -> EngineResult<EncodedAudio>;
}

/// What happened to a preview request
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    Started { duration_secs: f64 },
    /// `reason` is for logs, `message` is for the listener
    Unavailable { reason: String, message: String },
}

impl PreviewOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, PreviewOutcome::Started { .. })
    }

    pub fn unavailable(error: EngineError) -> Self {
        let reason = error.to_string();
        let message = AppError::from(error).user_message();
        PreviewOutcome::Unavailable { reason, message }
    }
}
