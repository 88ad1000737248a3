// crates/narrator/src/lib.rs
//! AI narrator: turns a book blurb into preview speech

mod client;
mod error;
mod retry;
mod wire;

pub use client::{
    GeminiNarrator, NarratorConfig, DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL,
    DEFAULT_VOICE,
};
pub use error::{NarratorError, NarratorResult};
pub use retry::RetryPolicy;
pub use wire::{InlineAudio, SpeechRequest, SpeechResponse};
