//! Audio-thread half of a channel strip
//!
//! Signal chain per track:
//! ```text
//! source → EQ high → EQ mid → EQ low → pan → gain ─┬─► master input
//!                                                  ├─► reverb send
//!                                                  └─► delay send
//! ```
//! The control side keeps the authoritative parameter values; this struct
//! only holds what the callback needs to render them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use basedrop::Owned;
use serde::{Deserialize, Serialize};

use super::source::SignalSource;
use crate::dsp::{EqBand, GainSmoother, StereoPanner, ThreeBandEq};
use crate::types::{StereoBuffer, TrackId, MAX_BLOCK_SIZE};

/// Shared send effect selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendEffect {
    Reverb,
    Delay,
}

impl SendEffect {
    pub const ALL: [SendEffect; 2] = [SendEffect::Reverb, SendEffect::Delay];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            SendEffect::Reverb => 0,
            SendEffect::Delay => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SendEffect::Reverb => "reverb",
            SendEffect::Delay => "delay",
        }
    }
}

impl std::str::FromStr for SendEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reverb" | "verb" => Ok(SendEffect::Reverb),
            "delay" | "echo" => Ok(SendEffect::Delay),
            other => Err(format!("unknown effect '{}'", other)),
        }
    }
}

/// Lock-free readback of a strip's state
///
/// Written by the audio thread, read by the meter sampler.
#[derive(Debug)]
pub struct ChannelAtomics {
    /// Gain applied at the end of the last block (f32 bits)
    gain: AtomicU32,
    /// Highest post-fader peak since the last `take_peak` (f32 bits)
    peak: AtomicU32,
}

impl ChannelAtomics {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AtomicU32::new(gain.to_bits()),
            peak: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Raise the held peak (non-negative values compare correctly as bits)
    #[inline]
    pub fn record_peak(&self, peak: f32) {
        self.peak.fetch_max(peak.max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Read and clear the held peak
    #[inline]
    pub fn take_peak(&self) -> f32 {
        f32::from_bits(self.peak.swap(0, Ordering::Relaxed))
    }
}

/// Initial parameter values for a strip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripParams {
    /// Effective gain (already resolved against solo/mute)
    pub gain: f32,
    pub pan: f32,
    /// EQ gains in dB, indexed high, mid, low
    pub eq_db: [f32; 3],
    /// Send levels 0..1, indexed reverb, delay
    pub sends: [f32; 2],
}

impl Default for StripParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            pan: 0.0,
            eq_db: [0.0; 3],
            sends: [0.0; 2],
        }
    }
}

/// Per-track processing state owned by the audio thread
pub struct StripDsp {
    id: TrackId,
    sample_rate: u32,
    eq: ThreeBandEq,
    panner: StereoPanner,
    gain: GainSmoother,
    sends: [f32; 2],
    source: Option<Owned<Box<dyn SignalSource>>>,
    buffer: StereoBuffer,
    atomics: Arc<ChannelAtomics>,
}

impl StripDsp {
    pub fn new(
        id: TrackId,
        sample_rate: u32,
        params: StripParams,
        atomics: Arc<ChannelAtomics>,
    ) -> Self {
        let mut eq = ThreeBandEq::new(sample_rate);
        for (band, db) in EqBand::ALL.iter().zip(params.eq_db) {
            eq.set_gain(*band, db);
        }
        let mut panner = StereoPanner::new();
        panner.set_pan(params.pan);
        atomics.set_gain(params.gain);

        Self {
            id,
            sample_rate,
            eq,
            panner,
            gain: GainSmoother::new(params.gain),
            sends: params.sends.map(|s| s.clamp(0.0, 1.0)),
            source: None,
            buffer: StereoBuffer::preallocated(MAX_BLOCK_SIZE, 0),
            atomics,
        }
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn set_gain(&mut self, gain: f32, ramp_frames: u32) {
        self.gain.set_target(gain, ramp_frames);
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.panner.set_pan(pan);
    }

    pub fn set_eq(&mut self, band: EqBand, gain_db: f32) {
        self.eq.set_gain(band, gain_db);
    }

    pub fn set_send(&mut self, effect: SendEffect, level: f32) {
        self.sends[effect.index()] = level.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn send_level(&self, effect: SendEffect) -> f32 {
        self.sends[effect.index()]
    }

    /// Swap in a new source; the previous one is returned for deferred drop
    pub fn attach_source(
        &mut self,
        source: Owned<Box<dyn SignalSource>>,
    ) -> Option<Owned<Box<dyn SignalSource>>> {
        self.source.replace(source)
    }

    pub fn reset_source(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.reset();
        }
    }

    /// Render one block into the strip buffer
    ///
    /// `running` gates the source; the chain still runs so filter state and
    /// gain ramps stay continuous.
    pub fn process(&mut self, n_frames: usize, running: bool) {
        self.buffer.set_len_from_capacity(n_frames);
        match self.source.as_mut() {
            Some(source) if running => source.render(&mut self.buffer, self.sample_rate),
            _ => self.buffer.fill_silence(),
        }

        self.eq.process(&mut self.buffer);
        self.panner.process(&mut self.buffer);
        self.gain.process(&mut self.buffer);

        self.atomics.set_gain(self.gain.current());
        self.atomics.record_peak(self.buffer.peak());
    }

    /// Post-fader output of the last block
    #[inline]
    pub fn output(&self) -> &StereoBuffer {
        &self.buffer
    }
}
