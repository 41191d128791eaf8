//! Device enumeration helpers shared by [`crate::cpal_backend::CpalBackend`].

use crate::{Error, Result};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

/// Audio device information, as reported by the host.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Host-reported device name.
    pub name: String,
    /// Whether the device supports input (capture).
    pub is_input: bool,
    /// Whether the device supports output (playback).
    pub is_output: bool,
    /// Sample rate the host reports as default for this device.
    pub default_sample_rate: u32,
}

/// List all available audio devices on the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device.name() {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate().0)
                    .unwrap_or(48000);
                let is_output = device.default_output_config().is_ok();
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate().0)
                    .unwrap_or(48000);
                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    Ok(devices)
}

/// The default input/output device pair reported by the host, if any.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        d.name().ok().map(|name| AudioDevice {
            name,
            is_input: true,
            is_output: false,
            default_sample_rate: d
                .default_input_config()
                .map(|c| c.sample_rate().0)
                .unwrap_or(48000),
        })
    });

    let output = host.default_output_device().and_then(|d| {
        d.name().ok().map(|name| AudioDevice {
            name,
            is_input: false,
            is_output: true,
            default_sample_rate: d
                .default_output_config()
                .map(|c| c.sample_rate().0)
                .unwrap_or(48000),
        })
    });

    Ok((input, output))
}

/// The host-reported name of `device`, or a placeholder if unavailable.
pub fn device_name(device: &Device) -> Result<String> {
    device.name().map_err(|e| Error::Stream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_devices_does_not_error() {
        assert!(list_devices().is_ok());
    }

    #[test]
    fn default_device_does_not_error() {
        assert!(default_device().is_ok());
    }
}
