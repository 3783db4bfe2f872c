//! Audio backend configuration
//!
//! Device selection, buffer settings and the backend kind used to acquire
//! the platform output.

use serde::{Deserialize, Serialize};

/// Common buffer sizes, in order of preference (frames)
/// - 128 frames @ 48kHz = ~2.7ms
/// - 256 frames @ 48kHz = ~5.3ms
/// - 512 frames @ 48kHz = ~10.7ms (safe default for most systems)
pub const LOW_LATENCY_BUFFER_SIZES: [u32; 3] = [128, 256, 512];

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default sample rate requested from the device
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Which backend acquires the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Platform device through CPAL
    #[default]
    Cpal,
    /// In-process output pulled by a renderer handle (tests, console)
    Headless,
}

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
    /// Smallest size from `LOW_LATENCY_BUFFER_SIZES` the device accepts
    LowLatency,
}

impl BufferSize {
    /// Get the buffer size in frames, or None for system default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some(*frames),
            BufferSize::LowLatency => Some(LOW_LATENCY_BUFFER_SIZES[1]),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Device name plus the host backend (ALSA, PipeWire, CoreAudio, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier; None searches every host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Backend used to acquire the output
    pub backend: BackendKind,

    /// Output device (None = use system default)
    pub device: Option<DeviceId>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Preferred sample rate (None = 48kHz when the device supports it)
    pub sample_rate: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            device: None,
            buffer_size: BufferSize::default(),
            sample_rate: None,
        }
    }
}

impl AudioConfig {
    /// Config for the headless backend
    pub fn headless() -> Self {
        Self {
            backend: BackendKind::Headless,
            ..Default::default()
        }
    }

    /// Set the output device
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    /// Set the preferred sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Sample rate to request from the device
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Buffer size to request from the device, in frames
    pub fn target_buffer_frames(&self) -> u32 {
        self.buffer_size
            .as_frames()
            .unwrap_or(DEFAULT_BUFFER_SIZE)
            .clamp(64, crate::types::MAX_BLOCK_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_latency() {
        assert_eq!(BufferSize::Default.latency_ms(48000), None);
        let ms = BufferSize::Fixed(480).latency_ms(48000).unwrap();
        assert!((ms - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_target_buffer_is_clamped() {
        assert_eq!(AudioConfig::default().target_buffer_frames(), DEFAULT_BUFFER_SIZE);
        assert_eq!(AudioConfig::default().with_buffer_frames(16).target_buffer_frames(), 64);
        assert_eq!(
            AudioConfig::default().with_buffer_frames(1 << 20).target_buffer_frames(),
            crate::types::MAX_BLOCK_SIZE as u32
        );
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("hw:0").display_label(), "hw:0");
        assert_eq!(DeviceId::with_host("hw:0", "ALSA").display_label(), "[ALSA] hw:0");
    }
}
