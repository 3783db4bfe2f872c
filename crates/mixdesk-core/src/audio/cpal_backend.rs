//! CPAL output backend
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Control Thread  │───push()───────────►│   Command Queue     │
//! │ (MixEngine calls)│                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         ▲                                           │ pop()
//!         │ relaxed atomics + analyzer tap            ▼
//!         │                                ┌─────────────────────┐
//!         └────────────────────────────────│  CPAL Audio Thread  │
//!                                          │  (owns MixGraph)    │
//!                                          └─────────────────────┘
//! ```
//!
//! The stream is built paused and counts as suspended until `resume`.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::backend::{AudioBackend, StreamInfo};
use super::config::{AudioConfig, BufferSize, LOW_LATENCY_BUFFER_SIZES};
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::graph::MixGraph;
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

/// Errors whose text points at an access refusal rather than a fault
fn is_permission_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("permission") || lower.contains("access denied")
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            AudioError::BackendUnavailable("output device disappeared".to_string())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            AudioError::UnsupportedFormat("stream configuration rejected by device".to_string())
        }
        other => {
            let message = other.to_string();
            if is_permission_error(&message) {
                AudioError::PermissionDenied
            } else {
                AudioError::StreamBuildError(message)
            }
        }
    }
}

/// State moved into the output callback
struct CallbackState {
    graph: MixGraph,
    block: StereoBuffer,
    channels: usize,
}

impl CallbackState {
    fn new(graph: MixGraph, channels: usize) -> Self {
        Self {
            graph,
            block: StereoBuffer::preallocated(MAX_BLOCK_SIZE, 0),
            channels: channels.max(1),
        }
    }

    /// Render into an interleaved device buffer, in graph-sized blocks
    fn render(&mut self, data: &mut [f32]) {
        let channels = self.channels;
        for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let n_frames = chunk.len() / channels;
            self.block.set_len_from_capacity(n_frames);
            self.graph.process(&mut self.block);

            if channels == 2 {
                chunk.copy_from_slice(self.block.as_interleaved());
                continue;
            }
            for (frame, sample) in chunk.chunks_mut(channels).zip(self.block.iter()) {
                frame[0] = if channels == 1 {
                    (sample.left + sample.right) * 0.5
                } else {
                    sample.left
                };
                if channels > 1 {
                    frame[1] = sample.right;
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }
}

/// Output through the platform's default or a named CPAL device
pub struct CpalBackend {
    device: Option<cpal::Device>,
    stream_config: Option<StreamConfig>,
    stream: Option<Stream>,
    suspended: bool,
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            device: None,
            stream_config: None,
            stream: None,
            suspended: true,
        }
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&mut self, config: &AudioConfig) -> AudioResult<StreamInfo> {
        let device = match &config.device {
            Some(id) => find_device_by_id(id)?,
            None => default_output_device()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let (supported, buffer_size) = get_output_config(&device, config)?;
        let sample_rate = supported.sample_rate().0;
        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: CpalBufferSize::Fixed(buffer_size),
        };

        let info = StreamInfo {
            device_name,
            sample_rate,
            buffer_size,
        };
        log::info!(
            "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
            stream_config.channels,
            sample_rate,
            buffer_size,
            info.latency_ms()
        );

        self.device = Some(device);
        self.stream_config = Some(stream_config);
        Ok(info)
    }

    fn start(&mut self, graph: MixGraph) -> AudioResult<()> {
        let (Some(device), Some(config)) = (self.device.as_ref(), self.stream_config.as_ref())
        else {
            return Err(AudioError::NotOpen);
        };

        let mut state = CallbackState::new(graph, config.channels as usize);
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| state.render(data),
                move |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(map_build_error)?;

        // Some hosts start streams immediately on build
        if let Err(e) = stream.pause() {
            log::warn!("Could not pause new stream: {}", e);
        }
        self.stream = Some(stream);
        self.suspended = true;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) -> AudioResult<()> {
        let stream = self.stream.as_ref().ok_or(AudioError::NotOpen)?;
        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => {
                AudioError::BackendUnavailable("output device disappeared".to_string())
            }
            other => {
                let message = other.to_string();
                if is_permission_error(&message) {
                    AudioError::PermissionDenied
                } else {
                    AudioError::StreamPlayError(message)
                }
            }
        })?;
        self.suspended = false;
        log::info!("Audio stream running");
        Ok(())
    }

    fn suspend(&mut self) -> AudioResult<()> {
        let stream = self.stream.as_ref().ok_or(AudioError::NotOpen)?;
        stream
            .pause()
            .map_err(|e| AudioError::StreamPauseError(e.to_string()))?;
        self.suspended = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Audio stream closed");
        }
        self.device = None;
        self.stream_config = None;
        self.suspended = true;
    }
}

/// Pick the best output configuration for a device
///
/// Returns (SupportedStreamConfig, buffer size in frames).
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| match e {
            cpal::SupportedStreamConfigsError::DeviceNotAvailable => {
                AudioError::BackendUnavailable("output device disappeared".to_string())
            }
            other => AudioError::ConfigError(other.to_string()),
        })?
        .collect();

    let target_rate = config.target_sample_rate();
    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0
    };

    // The callback writes f32 frames
    let best = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(in_range)
        .or_else(|| {
            supported_configs
                .iter()
                .filter(|c| c.sample_format() == SampleFormat::F32)
                .max_by_key(|c| c.channels())
        })
        .ok_or_else(|| {
            if supported_configs.is_empty() {
                AudioError::ConfigError("No supported output configurations".to_string())
            } else {
                AudioError::UnsupportedFormat("device has no f32 output configuration".to_string())
            }
        })?;

    let sample_rate = if in_range(&best) {
        cpal::SampleRate(target_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_rate,
            fallback.0
        );
        fallback
    };

    let buffer_size = match config.buffer_size {
        BufferSize::LowLatency => best_low_latency_size(best.buffer_size()),
        _ => config.target_buffer_frames(),
    };

    log::debug!(
        "Selected buffer size: {} frames for {:?} mode",
        buffer_size,
        config.buffer_size
    );

    Ok((best.clone().with_sample_rate(sample_rate), buffer_size))
}

/// Smallest preferred low-latency size the device range admits
fn best_low_latency_size(range: &cpal::SupportedBufferSize) -> u32 {
    match range {
        cpal::SupportedBufferSize::Range { min, max } => LOW_LATENCY_BUFFER_SIZES
            .into_iter()
            .find(|size| size >= min && size <= max)
            .unwrap_or(LOW_LATENCY_BUFFER_SIZES[LOW_LATENCY_BUFFER_SIZES.len() - 1]),
        cpal::SupportedBufferSize::Unknown => LOW_LATENCY_BUFFER_SIZES[1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_detection() {
        assert!(is_permission_error("ALSA: Permission denied (os error 13)"));
        assert!(is_permission_error("Access denied by policy"));
        assert!(!is_permission_error("device busy"));
    }

    #[test]
    fn test_low_latency_size_selection() {
        let range = cpal::SupportedBufferSize::Range { min: 200, max: 4096 };
        assert_eq!(best_low_latency_size(&range), 256);
        assert_eq!(best_low_latency_size(&cpal::SupportedBufferSize::Unknown), 256);
    }

    #[test]
    fn test_start_requires_open() {
        let mut backend = CpalBackend::new();
        assert!(backend.is_suspended());
        assert!(matches!(backend.resume(), Err(AudioError::NotOpen)));
        backend.close();
    }
}
