// crates/engine/src/audio_device.rs
// Output device enumeration and lookup

use crate::error::{EngineError, EngineResult};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use serde::{Deserialize, Serialize};

/// Information about an output device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    /// Stable identifier derived from the device name
    pub id: String,
    pub name: String,
    pub is_default: bool,
    /// Common sample rates the device accepts
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
    pub default_sample_rate: u32,
    pub default_channels: u16,
}

const COMMON_RATES: [u32; 9] = [
    8000, 11025, 16000, 22050, 24000, 44100, 48000, 96000, 192000,
];

/// Stable id for a device name
pub fn device_id(name: &str) -> String {
    format!("{:x}", md5::compute(name))
}

/// Enumerates output devices on the default host
pub struct AudioDeviceManager {
    host: Host,
    devices: Vec<AudioDeviceInfo>,
}

impl AudioDeviceManager {
    pub fn new() -> EngineResult<Self> {
        let mut manager = Self {
            host: cpal::default_host(),
            devices: Vec::new(),
        };
        manager.refresh_devices()?;
        Ok(manager)
    }

    pub fn refresh_devices(&mut self) -> EngineResult<()> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok());

        let devices = self
            .host
            .output_devices()
            .map_err(|e| EngineError::Output(format!("Failed to enumerate devices: {}", e)))?;

        self.devices = devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let is_default = default_name.as_deref() == Some(name.as_str());
                match describe(&device, &name, is_default) {
                    Ok(info) => Some(info),
                    Err(e) => {
                        log::debug!("Skipping device '{}': {}", name, e);
                        None
                    }
                }
            })
            .collect();

        self.devices.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(())
    }

    /// Default device first, then alphabetical
    pub fn list_devices(&self) -> &[AudioDeviceInfo] {
        &self.devices
    }

    /// Resolves a device by id or exact name; `None` selects the system default
    pub fn output_device(&self, selector: Option<&str>) -> EngineResult<(Device, AudioDeviceInfo)> {
        let wanted = match selector {
            Some(selector) => self
                .devices
                .iter()
                .find(|d| d.id == selector || d.name == selector)
                .ok_or_else(|| EngineError::Output(format!("Device not found: {}", selector)))?,
            None => self
                .devices
                .iter()
                .find(|d| d.is_default)
                .ok_or_else(|| EngineError::Output("No default output device".to_string()))?,
        };

        let devices = self
            .host
            .output_devices()
            .map_err(|e| EngineError::Output(format!("Failed to enumerate devices: {}", e)))?;

        for device in devices {
            if device.name().ok().as_deref() == Some(wanted.name.as_str()) {
                return Ok((device, wanted.clone()));
            }
        }

        Err(EngineError::Output(format!(
            "Audio device '{}' is no longer available",
            wanted.name
        )))
    }
}

fn describe(device: &Device, name: &str, is_default: bool) -> EngineResult<AudioDeviceInfo> {
    let configs = device
        .supported_output_configs()
        .map_err(|e| EngineError::Output(format!("Failed to get device configs: {}", e)))?;

    let mut sample_rates = Vec::new();
    let mut max_channels = 0;

    for config in configs {
        let (min, max) = (config.min_sample_rate().0, config.max_sample_rate().0);
        for rate in COMMON_RATES {
            if (min..=max).contains(&rate) && !sample_rates.contains(&rate) {
                sample_rates.push(rate);
            }
        }
        max_channels = max_channels.max(config.channels());
    }
    sample_rates.sort_unstable();

    let default = device
        .default_output_config()
        .map_err(|e| EngineError::Output(format!("No default config: {}", e)))?;

    Ok(AudioDeviceInfo {
        id: device_id(name),
        name: name.to_string(),
        is_default,
        sample_rates,
        max_channels,
        default_sample_rate: default.sample_rate().0,
        default_channels: default.channels(),
    })
}

/// Lists output devices on the default host
pub fn list_output_devices() -> EngineResult<Vec<AudioDeviceInfo>> {
    Ok(AudioDeviceManager::new()?.list_devices().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_is_stable() {
        assert_eq!(device_id("Speakers"), device_id("Speakers"));
        assert_ne!(device_id("Speakers"), device_id("Headphones"));
        assert_eq!(device_id("Speakers").len(), 32);
    }
}
