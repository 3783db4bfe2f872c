//! Audio backend trait for platform output implementations
//!
//! The graph manager acquires the output in two steps: `open` negotiates
//! the device format (the graph needs the sample rate before it can be
//! built), then `start` hands the graph to the output callback. A started
//! output may come up suspended; the manager resumes it explicitly.
//!
//! Backends are not `Send`: some platform streams must stay on the thread
//! that created them.

use crate::graph::MixGraph;

use super::config::{AudioConfig, BackendKind};
use super::cpal_backend::CpalBackend;
use super::error::AudioResult;
use super::headless::HeadlessBackend;

/// Negotiated stream format
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Human-readable device name
    pub device_name: String,
    pub sample_rate: u32,
    /// Buffer size in frames as requested from the device
    pub buffer_size: u32,
}

impl StreamInfo {
    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Platform audio output
pub trait AudioBackend {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Acquire the output device and negotiate the stream format
    fn open(&mut self, config: &AudioConfig) -> AudioResult<StreamInfo>;

    /// Hand the graph to the output callback
    ///
    /// The graph is owned by the audio thread from here on.
    fn start(&mut self, graph: MixGraph) -> AudioResult<()>;

    /// Whether the output is started but not pulling audio
    fn is_suspended(&self) -> bool;

    /// Start pulling audio
    fn resume(&mut self) -> AudioResult<()>;

    /// Stop pulling audio without releasing the device
    fn suspend(&mut self) -> AudioResult<()>;

    /// Release the output and drop the graph; repeated calls are no-ops
    fn close(&mut self);
}

/// Create the backend selected by the configuration
pub fn create_backend(kind: BackendKind) -> Box<dyn AudioBackend> {
    match kind {
        BackendKind::Cpal => Box::new(CpalBackend::new()),
        BackendKind::Headless => Box::new(HeadlessBackend::new()),
    }
}
