//! Signal sources feeding channel strips
//!
//! A source is whatever produces a track's raw audio: the sequencer, a
//! sample player, a test tone. Sources only render while the transport
//! runs; a strip with no source (or a stopped transport) sees silence.

use crate::types::{StereoBuffer, StereoSample};

/// Producer of a track's audio, rendered on the audio thread
///
/// Implementations must not allocate or block in `render`.
pub trait SignalSource: Send {
    /// Display name
    fn name(&self) -> &str;

    /// Fill `out` (already sized to the block) with the next block
    fn render(&mut self, out: &mut StereoBuffer, sample_rate: u32);

    /// Return to the initial state (transport stop)
    fn reset(&mut self) {}
}

/// Source that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl SignalSource for Silence {
    fn name(&self) -> &str {
        "silence"
    }

    fn render(&mut self, out: &mut StereoBuffer, _sample_rate: u32) {
        out.fill_silence();
    }
}

/// Continuous sine tone, identical on both channels
#[derive(Debug, Clone)]
pub struct SineTone {
    frequency: f32,
    amplitude: f32,
    phase: f32,
}

impl SineTone {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency: frequency.max(0.0),
            amplitude: amplitude.clamp(0.0, 1.0),
            phase: 0.0,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl SignalSource for SineTone {
    fn name(&self) -> &str {
        "sine"
    }

    fn render(&mut self, out: &mut StereoBuffer, sample_rate: u32) {
        let increment = self.frequency / sample_rate as f32;
        for sample in out.iter_mut() {
            let value = (self.phase * std::f32::consts::TAU).sin() * self.amplitude;
            *sample = StereoSample::mono(value);
            self.phase = (self.phase + increment).fract();
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_peak_matches_amplitude() {
        let mut tone = SineTone::new(1000.0, 0.5);
        let mut buf = StereoBuffer::silence(480);
        tone.render(&mut buf, 48000);
        assert!((buf.peak() - 0.5).abs() < 1e-3);
        assert_eq!(buf[0].left, 0.0);
        assert_eq!(buf[7].left, buf[7].right);
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut tone = SineTone::new(440.0, 1.0);
        let mut first = StereoBuffer::silence(64);
        tone.render(&mut first, 48000);
        tone.reset();
        let mut second = StereoBuffer::silence(64);
        tone.render(&mut second, 48000);
        assert_eq!(first.as_slice(), second.as_slice());
    }

    #[test]
    fn test_silence() {
        let mut buf = StereoBuffer::from_vec(vec![StereoSample::mono(1.0); 8]);
        Silence.render(&mut buf, 48000);
        assert_eq!(buf.peak(), 0.0);
    }
}
