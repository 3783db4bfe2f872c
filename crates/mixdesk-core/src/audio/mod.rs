//! Platform audio output for Mixdesk
//!
//! The audio graph manager acquires the output through an `AudioBackend`:
//! - **CpalBackend**: the platform device (ALSA/PipeWire, WASAPI, CoreAudio)
//! - **HeadlessBackend**: in-process output pulled by a renderer handle
//!
//! Both follow the same lock-free split:
//!
//! - **Control thread**: sends `GraphCommand`s through a ring buffer
//! - **Audio thread**: owns the `MixGraph` exclusively and drains commands
//!   at the start of every block
//! - **Readback**: relaxed atomics, the analyzer tap and the `AudioClock`
//!
//! # Example Usage
//!
//! ```ignore
//! use mixdesk_core::audio::{AudioConfig, HeadlessBackend};
//! use mixdesk_core::engine::MixEngine;
//!
//! let backend = HeadlessBackend::new();
//! let renderer = backend.renderer();
//! let mut engine = MixEngine::with_backend(Default::default(), Box::new(backend))?;
//! engine.initialize()?;
//! renderer.render_blocks(4);
//! ```

mod backend;
mod clock;
mod config;
mod cpal_backend;
mod device;
mod error;
mod headless;

pub use backend::{create_backend, AudioBackend, StreamInfo};
pub use clock::AudioClock;
pub use config::{
    AudioConfig, BackendKind, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE,
    LOW_LATENCY_BUFFER_SIZES,
};
pub use cpal_backend::CpalBackend;
pub use device::{get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use headless::{HeadlessBackend, HeadlessRenderer, HEADLESS_DEVICE_NAME};
