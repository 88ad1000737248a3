//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Rates offered by the player's rate button
pub const OFFERED_RATES: [f32; 5] = [0.8, 1.0, 1.25, 1.5, 2.0];

/// Player defaults and clock timings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume level at startup (0-100)
    pub default_volume: u8,

    /// Playback rate at startup, one of [`OFFERED_RATES`]
    pub default_rate: f32,

    /// Simulated clock tick interval in milliseconds
    pub tick_ms: u64,

    /// How often preview playback position is sampled, in milliseconds
    pub preview_poll_ms: u64,

    /// UI refresh rate in milliseconds
    pub ui_refresh_ms: u64,

    /// Seconds moved by the skip forward/back controls
    pub skip_secs: u32,

    /// Output device name or id; `None` uses the system default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 70,
            default_rate: 1.0,
            tick_ms: 1000,
            preview_poll_ms: 100,
            ui_refresh_ms: 100,
            skip_secs: 15,
            output_device: None,
        }
    }
}

impl PlayerConfig {
    /// Volume as a gain in `[0.0, 1.0]`
    pub fn volume_gain(&self) -> f32 {
        f32::from(self.default_volume.min(100)) / 100.0
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.default_volume, 0, 100, "player.default_volume"),
            Validator::one_of(&self.default_rate, &OFFERED_RATES, "player.default_rate"),
            Validator::in_range(self.tick_ms, 50, 5000, "player.tick_ms"),
            Validator::in_range(self.preview_poll_ms, 10, 1000, "player.preview_poll_ms"),
            Validator::in_range(self.ui_refresh_ms, 16, 1000, "player.ui_refresh_ms"),
            Validator::in_range(self.skip_secs, 1, 300, "player.skip_secs"),
        ];

        if let Some(device) = &self.output_device {
            results.push(Validator::not_empty(device, "player.output_device"));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.default_volume = other.default_volume;
        self.default_rate = other.default_rate;
        self.tick_ms = other.tick_ms;
        self.preview_poll_ms = other.preview_poll_ms;
        self.ui_refresh_ms = other.ui_refresh_ms;
        self.skip_secs = other.skip_secs;
        if other.output_device.is_some() {
            self.output_device = other.output_device;
        }
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}
