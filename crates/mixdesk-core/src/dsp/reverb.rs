//! Freeverb-style stereo reverb used as a send return
//!
//! Eight damped comb filters per channel in parallel, followed by four
//! allpass diffusers. The right channel uses slightly longer lines for
//! stereo spread. Output is fully wet.

use crate::types::StereoBuffer;

/// Comb filter delay line lengths (in samples at 44.1kHz)
const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];

/// Allpass filter delay line lengths (in samples at 44.1kHz)
const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];

/// Extra samples on the right channel lines
const STEREO_SPREAD: usize = 23;

const ALLPASS_FEEDBACK: f32 = 0.5;

/// Gain compensation for comb filter summing
const COMB_GAIN: f32 = 0.2;

fn scaled_len(length: usize, sample_rate: u32) -> usize {
    ((length as f32 * sample_rate as f32 / 44100.0) as usize).max(1)
}

struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length],
            pos: 0,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        let output = -input + buffered;
        self.buffer[self.pos] = input + buffered * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Stereo reverb return
pub struct Reverb {
    combs_l: Vec<CombFilter>,
    combs_r: Vec<CombFilter>,
    allpass_l: Vec<AllpassFilter>,
    allpass_r: Vec<AllpassFilter>,
    /// Comb feedback (0.7 .. 0.98)
    feedback: f32,
    damping: f32,
    width: f32,
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let combs = |spread: usize| -> Vec<CombFilter> {
            COMB_LENGTHS
                .iter()
                .map(|&len| CombFilter::new(scaled_len(len + spread, sample_rate)))
                .collect()
        };
        let allpasses = |spread: usize| -> Vec<AllpassFilter> {
            ALLPASS_LENGTHS
                .iter()
                .map(|&len| AllpassFilter::new(scaled_len(len + spread, sample_rate)))
                .collect()
        };

        let mut reverb = Self {
            combs_l: combs(0),
            combs_r: combs(STEREO_SPREAD),
            allpass_l: allpasses(0),
            allpass_r: allpasses(STEREO_SPREAD),
            feedback: 0.0,
            damping: 0.5,
            width: 1.0,
        };
        reverb.set_room_size(0.5);
        reverb
    }

    /// Room size 0..1, mapped onto comb feedback
    pub fn set_room_size(&mut self, size: f32) {
        self.feedback = 0.7 + size.clamp(0.0, 1.0) * 0.28;
    }

    /// High frequency damping (0 = bright, 1 = dark)
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
    }

    /// Stereo width (0 = mono, 1 = full)
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.0, 1.0);
    }

    /// Replace the buffer with its reverberation
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        let wet1 = self.width / 2.0 + 0.5;
        let wet2 = (1.0 - self.width) / 2.0;
        let (feedback, damp) = (self.feedback, self.damping);

        for sample in buffer.iter_mut() {
            let input = (sample.left + sample.right) * 0.5;

            let mut out_l: f32 = self
                .combs_l
                .iter_mut()
                .map(|c| c.process(input, feedback, damp))
                .sum();
            let mut out_r: f32 = self
                .combs_r
                .iter_mut()
                .map(|c| c.process(input, feedback, damp))
                .sum();
            out_l *= COMB_GAIN;
            out_r *= COMB_GAIN;

            for ap in &mut self.allpass_l {
                out_l = ap.process(out_l);
            }
            for ap in &mut self.allpass_r {
                out_r = ap.process(out_r);
            }

            sample.left = out_l * wet1 + out_r * wet2;
            sample.right = out_r * wet1 + out_l * wet2;
        }
    }

    pub fn reset(&mut self) {
        self.combs_l.iter_mut().chain(self.combs_r.iter_mut()).for_each(CombFilter::reset);
        self.allpass_l.iter_mut().chain(self.allpass_r.iter_mut()).for_each(AllpassFilter::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StereoSample, SAMPLE_RATE};

    fn impulse_response(reverb: &mut Reverb) -> StereoBuffer {
        let mut buffer = StereoBuffer::silence(8192);
        buffer[0] = StereoSample::new(1.0, 1.0);
        reverb.process(&mut buffer);
        buffer
    }

    #[test]
    fn test_tail_after_comb_delays() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        let ir = impulse_response(&mut reverb);
        // Nothing before the shortest comb line
        assert!(ir.iter().take(1000).all(|s| s.left == 0.0 && s.right == 0.0));
        let energy: f32 = ir.iter().skip(1500).map(|s| s.left.abs()).sum();
        assert!(energy > 0.0);
    }

    #[test]
    fn test_stereo_spread() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        let ir = impulse_response(&mut reverb);
        assert!(ir.iter().skip(1500).any(|s| (s.left - s.right).abs() > 1e-4));
    }

    #[test]
    fn test_reset_silences_tail() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        impulse_response(&mut reverb);
        reverb.reset();
        let mut buffer = StereoBuffer::silence(4096);
        reverb.process(&mut buffer);
        assert_eq!(buffer.peak(), 0.0);
    }
}
