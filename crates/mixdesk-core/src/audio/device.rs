//! Output device enumeration and lookup
//!
//! Devices are listed from every available CPAL host so a configuration
//! can name e.g. an ALSA device while PipeWire is the default host.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Common sample rates probed against each device's supported ranges
const PROBE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// Human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| host_name(*id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// An audio output device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub id: DeviceId,
    pub name: String,
    /// Host backend name (e.g. "ALSA", "CoreAudio")
    pub host: String,
    /// Whether this is the default device of its host
    pub is_default: bool,
    /// Supported rates among `PROBE_RATES`
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// All output devices from all hosts, default devices first
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut all_devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_label = host_name(host_id);
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let devices = match host.output_devices() {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate devices for {:?}: {}", host_id, e);
                continue;
            }
        };

        for device in devices {
            let Ok(name) = device.name() else { continue };
            let Ok(configs) = device.supported_output_configs() else { continue };
            let configs: Vec<_> = configs.collect();
            if configs.is_empty() {
                continue;
            }

            let max_channels = configs.iter().map(|c| c.channels()).max().unwrap_or(0);
            let sample_rates = PROBE_RATES
                .into_iter()
                .filter(|rate| {
                    configs.iter().any(|c| {
                        *rate >= c.min_sample_rate().0 && *rate <= c.max_sample_rate().0
                    })
                })
                .collect();

            all_devices.push(AudioDevice {
                id: DeviceId::with_host(&name, &host_label),
                is_default: default_name.as_ref() == Some(&name),
                name,
                host: host_label.clone(),
                sample_rates,
                max_channels,
            });
        }
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    all_devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });

    log::info!("Enumerated {} audio output devices", all_devices.len());
    Ok(all_devices)
}

/// Find a device by its ID, searching the named host or every host
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<cpal::Device> {
    if let Some(host) = id.host.as_deref().and_then(host_by_name) {
        return host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
            .ok_or_else(|| AudioError::DeviceNotFound(id.name.clone()));
    }

    cpal::available_hosts()
        .into_iter()
        .filter_map(|host_id| cpal::host_from_id(host_id).ok())
        .filter_map(|host| host.output_devices().ok())
        .flatten()
        .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
        .ok_or_else(|| AudioError::DeviceNotFound(id.name.clone()))
}

/// Default output device of the default host
pub fn default_output_device() -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    if host.devices().is_err() {
        return Err(AudioError::BackendUnavailable(format!(
            "{} host cannot enumerate devices",
            host_name(host.id())
        )));
    }
    host.default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice("No default output device".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_enumeration() {
        // May find nothing on CI machines
        match get_output_devices() {
            Ok(devices) => {
                for device in &devices {
                    println!("  - {} rates {:?}", device, device.sample_rates);
                }
            }
            Err(AudioError::NoDevices) => println!("No audio devices available"),
            Err(e) => println!("Error enumerating devices: {}", e),
        }
    }

    #[test]
    fn test_unknown_device_not_found() {
        let id = DeviceId::new("mixdesk-no-such-device");
        assert!(matches!(find_device_by_id(&id), Err(AudioError::DeviceNotFound(_))));
    }
}
