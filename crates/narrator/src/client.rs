// crates/narrator/src/client.rs
//! Gemini text-to-speech client

use crate::error::{NarratorError, NarratorResult};
use crate::retry::RetryPolicy;
use crate::wire::{error_message, SpeechRequest, SpeechResponse};
use async_trait::async_trait;
use audioshelf_engine::{EncodedAudio, EngineResult, PreviewAudioProvider};
use reqwest::Client as ReqwestClient;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Puck";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Narrator client configuration
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// Base URL, without the `/models/...` suffix
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub api_key: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry_policy: RetryPolicy,
}

impl NarratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Audioshelf/{}", env!("CARGO_PKG_VERSION")),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Reads the key from `env_var`
    pub fn from_env(env_var: &str) -> NarratorResult<Self> {
        match std::env::var(env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(NarratorError::MissingApiKey(env_var.to_string())),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Full `generateContent` URL for the configured model
    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Speech synthesis through Gemini
#[derive(Clone)]
pub struct GeminiNarrator {
    inner: ReqwestClient,
    config: NarratorConfig,
}

impl GeminiNarrator {
    pub fn new(config: NarratorConfig) -> NarratorResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(NarratorError::MissingApiKey(DEFAULT_API_KEY_ENV.to_string()));
        }

        let inner = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(NarratorError::Http)?;

        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    /// Synthesizes `text`, retrying transport and server failures
    pub async fn synthesize(&self, text: &str) -> NarratorResult<EncodedAudio> {
        let request = SpeechRequest::new(text, &self.config.voice);
        let policy = &self.config.retry_policy;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send(&request).await {
                Ok(audio) => {
                    log::info!(
                        "Narration ready: {} bytes ({})",
                        audio.bytes.len(),
                        audio.mime_type.as_deref().unwrap_or("unknown format")
                    );
                    return Ok(audio);
                }
                Err(e) if e.is_retryable() && attempt < policy.max_attempts() => {
                    let delay = policy.delay_for_attempt(attempt);
                    log::warn!(
                        "Narration attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, request: &SpeechRequest) -> NarratorResult<EncodedAudio> {
        log::debug!("Requesting narration from {}", self.config.model);

        let response = self
            .inner
            .post(self.config.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarratorError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: SpeechResponse = response
            .json()
            .await
            .map_err(|e| NarratorError::InvalidPayload(e.to_string()))?;
        let audio = body.into_audio()?;

        let encoded = EncodedAudio::new(audio.bytes);
        Ok(match audio.mime_type {
            Some(mime) => encoded.with_mime_type(mime),
            None => encoded,
        })
    }
}

#[async_trait]
impl PreviewAudioProvider for GeminiNarrator {
    async fn request_preview_audio(&self, text: &str) -> EngineResult<EncodedAudio> {
        Ok(self.synthesize(text).await?)
    }
}

impl std::fmt::Debug for GeminiNarrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiNarrator")
            .field("model", &self.config.model)
            .field("voice", &self.config.voice)
            .finish()
    }
}
