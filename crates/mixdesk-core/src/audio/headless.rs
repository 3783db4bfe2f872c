//! In-process output without a device
//!
//! The graph is pulled by a `HeadlessRenderer` handle instead of a platform
//! callback: tests render exact block counts, the console binary runs a
//! paced render thread. The backend can also stand in for a device that
//! starts suspended, resumes late, or is missing altogether.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::graph::MixGraph;
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

use super::backend::{AudioBackend, StreamInfo};
use super::config::AudioConfig;
use super::error::{AudioError, AudioResult};

/// Device name reported by the headless backend
pub const HEADLESS_DEVICE_NAME: &str = "headless";

struct HeadlessState {
    graph: Option<MixGraph>,
    suspended: bool,
    /// Set by `close`; a resume completing afterward is discarded
    torn_down: bool,
    resume_pending: bool,
    block: StereoBuffer,
    buffer_size: u32,
    sample_rate: u32,
}

impl HeadlessState {
    fn is_live(&self) -> bool {
        self.graph.is_some() && !self.suspended && !self.torn_down
    }
}

fn lock(shared: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Output pulled by a `HeadlessRenderer`
pub struct HeadlessBackend {
    shared: Arc<Mutex<HeadlessState>>,
    start_suspended: bool,
    deferred_resume: bool,
    failure: Option<AudioError>,
    opened: bool,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(HeadlessState {
                graph: None,
                suspended: false,
                torn_down: false,
                resume_pending: false,
                block: StereoBuffer::preallocated(MAX_BLOCK_SIZE, 0),
                buffer_size: super::config::DEFAULT_BUFFER_SIZE,
                sample_rate: super::config::DEFAULT_SAMPLE_RATE,
            })),
            start_suspended: false,
            deferred_resume: false,
            failure: None,
            opened: false,
        }
    }

    /// Come up suspended after `start`, like an autoplay-restricted output
    pub fn start_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    /// `resume` only requests; the renderer completes it later
    pub fn deferred_resume(mut self) -> Self {
        self.deferred_resume = true;
        self
    }

    /// Make `open` fail with `error`
    pub fn failing_with(mut self, error: AudioError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Handle for pulling audio out of the graph
    pub fn renderer(&self) -> HeadlessRenderer {
        HeadlessRenderer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl AudioBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn open(&mut self, config: &AudioConfig) -> AudioResult<StreamInfo> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut state = lock(&self.shared);
        state.sample_rate = config.target_sample_rate();
        state.buffer_size = config.target_buffer_frames();
        self.opened = true;

        Ok(StreamInfo {
            device_name: HEADLESS_DEVICE_NAME.to_string(),
            sample_rate: state.sample_rate,
            buffer_size: state.buffer_size,
        })
    }

    fn start(&mut self, graph: MixGraph) -> AudioResult<()> {
        if !self.opened {
            return Err(AudioError::NotOpen);
        }
        let mut state = lock(&self.shared);
        state.graph = Some(graph);
        state.suspended = self.start_suspended;
        state.torn_down = false;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        lock(&self.shared).suspended
    }

    fn resume(&mut self) -> AudioResult<()> {
        let mut state = lock(&self.shared);
        if state.graph.is_none() || state.torn_down {
            return Err(AudioError::NotOpen);
        }
        if self.deferred_resume {
            state.resume_pending = true;
        } else {
            state.suspended = false;
        }
        Ok(())
    }

    fn suspend(&mut self) -> AudioResult<()> {
        let mut state = lock(&self.shared);
        if state.graph.is_none() {
            return Err(AudioError::NotOpen);
        }
        state.suspended = true;
        state.resume_pending = false;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.shared);
        state.torn_down = true;
        state.resume_pending = false;
        state.suspended = true;
        // Graph drop happens here, on the control thread
        state.graph = None;
        self.opened = false;
    }
}

/// Pulls audio from a `HeadlessBackend`
#[derive(Clone)]
pub struct HeadlessRenderer {
    shared: Arc<Mutex<HeadlessState>>,
}

impl HeadlessRenderer {
    /// Whether a render call would produce audio
    pub fn is_live(&self) -> bool {
        lock(&self.shared).is_live()
    }

    pub fn is_suspended(&self) -> bool {
        lock(&self.shared).suspended
    }

    pub fn is_torn_down(&self) -> bool {
        lock(&self.shared).torn_down
    }

    /// Buffer size negotiated at open, in frames
    pub fn buffer_size(&self) -> u32 {
        lock(&self.shared).buffer_size
    }

    pub fn sample_rate(&self) -> u32 {
        lock(&self.shared).sample_rate
    }

    /// Finish a deferred resume; returns whether the output is now running
    ///
    /// A resume that completes after `close` is discarded.
    pub fn complete_resume(&self) -> bool {
        let mut state = lock(&self.shared);
        if state.resume_pending {
            state.resume_pending = false;
            if !state.torn_down {
                state.suspended = false;
            }
        }
        state.is_live()
    }

    /// Render `frames` frames and return them
    ///
    /// Returns an empty buffer while the output is suspended or closed.
    pub fn render(&self, frames: usize) -> StereoBuffer {
        let mut out = Vec::new();
        let mut guard = lock(&self.shared);
        if !guard.is_live() {
            return StereoBuffer::from_vec(out);
        }
        out.reserve(frames);

        let state = &mut *guard;
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(MAX_BLOCK_SIZE);
            state.block.set_len_from_capacity(n);
            if let Some(graph) = state.graph.as_mut() {
                graph.process(&mut state.block);
            }
            out.extend_from_slice(state.block.as_slice());
            remaining -= n;
        }
        StereoBuffer::from_vec(out)
    }

    /// Render `count` blocks of the negotiated buffer size
    pub fn render_blocks(&self, count: usize) -> StereoBuffer {
        let frames = self.buffer_size() as usize * count;
        self.render(frames)
    }

    /// Render `secs` seconds of audio
    pub fn render_secs(&self, secs: f64) -> StereoBuffer {
        let frames = (secs.max(0.0) * self.sample_rate() as f64).round() as usize;
        self.render(frames)
    }

    /// Pull one block per buffer period on a background thread
    ///
    /// The thread exits once the backend is closed.
    pub fn spawn_realtime(&self) -> std::io::Result<JoinHandle<()>> {
        let renderer = self.clone();
        thread::Builder::new()
            .name("mixdesk-headless".to_string())
            .spawn(move || {
                let period = Duration::from_secs_f64(
                    renderer.buffer_size() as f64 / renderer.sample_rate() as f64,
                );
                log::debug!("Headless render thread started ({:?} period)", period);
                while !renderer.is_torn_down() {
                    renderer.complete_resume();
                    renderer.render_blocks(1);
                    thread::sleep(period);
                }
                log::debug!("Headless render thread stopped");
            })
    }
}
