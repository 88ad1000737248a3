// crates/narrator/src/wire.rs
//! JSON shapes for the `generateContent` speech endpoint

use crate::error::{NarratorError, NarratorResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl SpeechRequest {
    /// Single-turn request reading `text` with a prebuilt voice
    pub fn new(text: &str, voice: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

/// Decoded audio carried by a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAudio {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl SpeechResponse {
    /// The first inline audio part of the first candidate
    pub fn into_audio(self) -> NarratorResult<InlineAudio> {
        let inline = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
            .ok_or(NarratorError::EmptyResponse)?;

        if inline.data.is_empty() {
            return Err(NarratorError::EmptyResponse);
        }

        let bytes = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| NarratorError::InvalidPayload(format!("Bad base64 audio: {}", e)))?;

        Ok(InlineAudio {
            bytes,
            mime_type: inline.mime_type,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Best-effort message from an error response body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = SpeechRequest::new("Here is a preview", "Puck");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{"parts": [{"text": "Here is a preview"}]}],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_audio_extracted_from_first_candidate() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{
                    "inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAAQA=="}
                }]}
            }]
        });
        let response: SpeechResponse = serde_json::from_value(body).unwrap();
        let audio = response.into_audio().unwrap();
        assert_eq!(audio.bytes, vec![0, 0, 0, 0x40]);
        assert_eq!(
            audio.mime_type.as_deref(),
            Some("audio/L16;codec=pcm;rate=24000")
        );
    }

    #[test]
    fn test_missing_audio_is_empty_response() {
        let response: SpeechResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            response.into_audio(),
            Err(NarratorError::EmptyResponse)
        ));

        let text_only: SpeechResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "sorry"}]}}]
        }))
        .unwrap();
        assert!(matches!(
            text_only.into_audio(),
            Err(NarratorError::EmptyResponse)
        ));
    }

    #[test]
    fn test_bad_base64_is_invalid_payload() {
        let response: SpeechResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "!!!"}}]}}]
        }))
        .unwrap();
        assert!(matches!(
            response.into_audio(),
            Err(NarratorError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_error_message_parsing() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }
}
