//! AI narrator configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Speech synthesis settings for AI narrator previews
///
/// The API key itself never lives in the file; `api_key_env` names the
/// environment variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarratorConfig {
    pub api_key_env: String,

    pub model: String,

    /// Prebuilt voice name
    pub voice: String,

    /// Base URL of the generative language API
    pub endpoint: String,

    /// Sample rate assumed for raw PCM responses without a `rate=` parameter
    pub sample_rate_hint: u32,

    pub channel_hint: u16,

    pub timeout_secs: u64,

    /// Description characters included in the narration text
    pub preview_chars: usize,

    /// Total attempts per request, including the first
    pub max_attempts: u32,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Puck".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            sample_rate_hint: 24_000,
            channel_hint: 1,
            timeout_secs: 30,
            preview_chars: 150,
            max_attempts: 3,
        }
    }
}

impl NarratorConfig {
    /// Reads the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl ConfigSection for NarratorConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::env_var_name(&self.api_key_env, "narrator.api_key_env"),
            Validator::not_empty(&self.model, "narrator.model"),
            Validator::not_empty(&self.voice, "narrator.voice"),
            Validator::http_url(&self.endpoint, "narrator.endpoint"),
            Validator::in_range(
                self.sample_rate_hint,
                8_000,
                192_000,
                "narrator.sample_rate_hint",
            ),
            Validator::in_range(self.channel_hint, 1, 8, "narrator.channel_hint"),
            Validator::in_range(self.timeout_secs, 1, 300, "narrator.timeout_secs"),
            Validator::in_range(self.preview_chars, 0, 2000, "narrator.preview_chars"),
            Validator::in_range(self.max_attempts, 1, 10, "narrator.max_attempts"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.api_key_env = other.api_key_env;
        self.model = other.model;
        self.voice = other.voice;
        self.endpoint = other.endpoint;
        self.sample_rate_hint = other.sample_rate_hint;
        self.channel_hint = other.channel_hint;
        self.timeout_secs = other.timeout_secs;
        self.preview_chars = other.preview_chars;
        self.max_attempts = other.max_attempts;
    }

    fn section_name(&self) -> &'static str {
        "narrator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = NarratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.voice, "Puck");
        assert_eq!(config.sample_rate_hint, 24_000);
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = NarratorConfig::default();
        config.endpoint = "generativelanguage.googleapis.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_hints() {
        let config = NarratorConfig {
            sample_rate_hint: 0,
            channel_hint: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn test_api_key_from_named_variable() {
        let config = NarratorConfig {
            api_key_env: "AUDIOSHELF_TEST_NARRATOR_KEY_UNSET".to_string(),
            ..Default::default()
        };
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_merge() {
        let mut base = NarratorConfig::default();
        let other = NarratorConfig {
            voice: "Kore".to_string(),
            max_attempts: 1,
            ..Default::default()
        };

        base.merge(other);
        assert_eq!(base.voice, "Kore");
        assert_eq!(base.max_attempts, 1);
    }
}
