//! Playback engine for Audioshelf.
//!
//! Catalog books play on a simulated wall clock; AI narrator previews play
//! real decoded audio through cpal. [`PlaybackCoordinator`] arbitrates
//! between the two so exactly one clock drives the position.

mod audio_device;
mod clock;
mod context;
mod coordinator;
mod decoder;
mod error;
mod output;
mod preview;
mod realtime;
mod resampler;
mod simulated;
mod speed;
mod state;

pub use audio_device::{device_id, list_output_devices, AudioDeviceInfo, AudioDeviceManager};
pub use clock::{ClockDriver, ClockHandle, ClockKind};
pub use context::{
    AudioContext, AudioGraph, ContextFactory, ContextSlot, ContextState, GraphControl,
    SharedContext,
};
pub use coordinator::{CoordinatorConfig, PlaybackCoordinator, DEFAULT_SKIP_SECS};
pub use decoder::{decode_blocking, DecodeHints, DecodedBuffer, EncodedAudio, PreviewDecoder};
pub use error::{EngineError, EngineResult};
pub use output::{AudioOutputConfig, CpalContext};
pub use preview::{PreviewAudioProvider, PreviewOutcome};
pub use realtime::{RealAudioDriver, DEFAULT_POLL};
pub use resampler::{resample, ResampleQuality};
pub use simulated::{advance_simulated, SimulatedDriver, TickOutcome, DEFAULT_TICK};
pub use speed::{PlaybackRate, RATE_STEPS};
pub use state::{ActiveItem, PlaybackMode, PlaybackSnapshot, PlaybackState, PreviewItem, SharedState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _ = PlaybackMode::Idle;
        let _ = PlaybackRate::default();
        let _ = CoordinatorConfig::default();
    }

    #[test]
    fn test_error_display() {
        let error = EngineError::Decode("bad header".to_string());
        assert!(format!("{}", error).contains("bad header"));
        assert!(EngineError::AlreadyStopped.is_benign());
    }
}
