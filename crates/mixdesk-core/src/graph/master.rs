//! Master bus and shared send returns
//!
//! ```text
//! strips ──► Σ ──► compressor ──► analyzer tap ──► master gain ──► output
//!            ▲
//!   reverb return ◄── Σ sends
//!   delay return  ◄── Σ sends
//! ```
//! The master bus is the only path to the device. Compressor settings are
//! fixed when the bus is built.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use super::strip::{SendEffect, StripDsp};
use crate::dsp::{Compressor, CompressorSettings, GainSmoother, Reverb, StereoDelay};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

/// Capacity of the analyzer tap in mono samples (~340 ms at 48kHz)
pub const ANALYZER_TAP_CAPACITY: usize = 16384;

/// Create the analyzer tap ring (producer for audio, consumer for control)
pub fn analyzer_tap() -> (rtrb::Producer<f32>, rtrb::Consumer<f32>) {
    rtrb::RingBuffer::new(ANALYZER_TAP_CAPACITY)
}

/// Lock-free readback of the master bus
#[derive(Debug, Default)]
pub struct MasterAtomics {
    /// Highest output peak since the last read (f32 bits)
    peak: AtomicU32,
    /// Current compressor gain reduction in dB (f32 bits)
    reduction_db: AtomicU32,
    /// Tap samples dropped because the control side fell behind
    tap_dropped: AtomicU64,
}

impl MasterAtomics {
    pub fn take_peak(&self) -> f32 {
        f32::from_bits(self.peak.swap(0, Ordering::Relaxed))
    }

    pub fn reduction_db(&self) -> f32 {
        f32::from_bits(self.reduction_db.load(Ordering::Relaxed))
    }

    pub fn tap_dropped(&self) -> u64 {
        self.tap_dropped.load(Ordering::Relaxed)
    }
}

/// Shared reverb and delay returns
pub struct SendReturns {
    reverb: Reverb,
    delay: StereoDelay,
    buses: [StereoBuffer; 2],
}

impl SendReturns {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            reverb: Reverb::new(sample_rate),
            delay: StereoDelay::new(sample_rate),
            buses: std::array::from_fn(|_| StereoBuffer::preallocated(MAX_BLOCK_SIZE, 0)),
        }
    }

    /// Clear the send buses for a new block
    pub fn begin(&mut self, n_frames: usize) {
        for bus in &mut self.buses {
            bus.set_len_from_capacity(n_frames);
            bus.fill_silence();
        }
    }

    /// Add a strip's post-fader output to each bus at its send level
    pub fn accumulate(&mut self, strip: &StripDsp) {
        for effect in SendEffect::ALL {
            self.buses[effect.index()].add_scaled(strip.output(), strip.send_level(effect));
        }
    }

    /// Run the effects and sum their returns into `mix`
    pub fn render_into(&mut self, mix: &mut StereoBuffer) {
        let [reverb_bus, delay_bus] = &mut self.buses;
        self.reverb.process(reverb_bus);
        self.delay.process(delay_bus);
        mix.add_buffer(reverb_bus);
        mix.add_buffer(delay_bus);
    }

    pub fn reset(&mut self) {
        self.reverb.reset();
        self.delay.reset();
    }
}

/// The singleton output stage
pub struct MasterBus {
    compressor: Compressor,
    gain: GainSmoother,
    tap: Option<rtrb::Producer<f32>>,
    atomics: Arc<MasterAtomics>,
}

impl MasterBus {
    pub fn new(
        settings: CompressorSettings,
        master_gain: f32,
        sample_rate: u32,
        tap: Option<rtrb::Producer<f32>>,
    ) -> Self {
        Self {
            compressor: Compressor::new(settings, sample_rate),
            gain: GainSmoother::new(master_gain.clamp(0.0, 1.0)),
            tap,
            atomics: Arc::new(MasterAtomics::default()),
        }
    }

    pub fn atomics(&self) -> Arc<MasterAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn set_gain(&mut self, gain: f32, ramp_frames: u32) {
        self.gain.set_target(gain.clamp(0.0, 1.0), ramp_frames);
    }

    pub fn gain(&self) -> f32 {
        self.gain.target()
    }

    /// Process the summed strip input into the device output, in place
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        self.compressor.process(buffer);

        if let Some(tap) = self.tap.as_mut() {
            let mut dropped = 0u64;
            for sample in buffer.iter() {
                if tap.push((sample.left + sample.right) * 0.5).is_err() {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                self.atomics.tap_dropped.fetch_add(dropped, Ordering::Relaxed);
            }
        }

        self.gain.process(buffer);

        self.atomics
            .peak
            .fetch_max(buffer.peak().to_bits(), Ordering::Relaxed);
        self.atomics
            .reduction_db
            .store(self.compressor.reduction_db().to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StereoSample, SAMPLE_RATE};

    #[test]
    fn test_tap_receives_mono_pre_gain() {
        let (producer, mut consumer) = analyzer_tap();
        let mut bus = MasterBus::new(CompressorSettings::default(), 0.0, SAMPLE_RATE, Some(producer));

        let mut buf = StereoBuffer::from_vec(vec![StereoSample::new(0.002, 0.0); 4]);
        bus.process(&mut buf);

        // Master gain 0 silences the output but not the tap
        assert_eq!(buf.peak(), 0.0);
        let tapped: Vec<f32> = std::iter::from_fn(|| consumer.pop().ok()).collect();
        assert_eq!(tapped.len(), 4);
        assert!((tapped[0] - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_full_tap_drops_instead_of_blocking() {
        let (producer, _consumer) = analyzer_tap();
        let mut bus = MasterBus::new(CompressorSettings::default(), 1.0, SAMPLE_RATE, Some(producer));
        let atomics = bus.atomics();

        let mut buf = StereoBuffer::silence(MAX_BLOCK_SIZE);
        for _ in 0..3 {
            bus.process(&mut buf);
        }
        assert_eq!(atomics.tap_dropped(), (3 * MAX_BLOCK_SIZE - ANALYZER_TAP_CAPACITY) as u64);
    }

    #[test]
    fn test_returns_silent_without_sends() {
        let mut returns = SendReturns::new(SAMPLE_RATE);
        returns.begin(128);
        let mut mix = StereoBuffer::from_vec(vec![StereoSample::mono(0.25); 128]);
        returns.render_into(&mut mix);
        assert!(mix.iter().all(|s| s.left == 0.25));
    }
}
