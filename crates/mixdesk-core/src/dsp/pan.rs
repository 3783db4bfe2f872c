//! Equal-power stereo panner
//!
//! Stereo input keeps both channels at center; moving the pan folds one
//! side into the other with a cos/sin law, so a hard pan sends the full
//! signal to one output.

use crate::types::StereoBuffer;

/// Per-position channel gains
#[derive(Debug, Clone, Copy, PartialEq)]
struct PanGains {
    left_position: bool,
    gain_l: f32,
    gain_r: f32,
}

impl PanGains {
    fn for_position(pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        let left_position = pan <= 0.0;
        let x = if left_position { pan + 1.0 } else { pan };
        let theta = x * std::f32::consts::FRAC_PI_2;
        Self {
            left_position,
            gain_l: theta.cos(),
            gain_r: theta.sin(),
        }
    }
}

/// Stereo panner with pan in [-1, 1]
#[derive(Debug, Clone)]
pub struct StereoPanner {
    pan: f32,
    gains: PanGains,
}

impl Default for StereoPanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoPanner {
    pub fn new() -> Self {
        Self {
            pan: 0.0,
            gains: PanGains::for_position(0.0),
        }
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
        self.gains = PanGains::for_position(self.pan);
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn process(&self, buffer: &mut StereoBuffer) {
        let g = self.gains;
        for sample in buffer.iter_mut() {
            let (l, r) = (sample.left, sample.right);
            if g.left_position {
                sample.left = l + r * g.gain_l;
                sample.right = r * g.gain_r;
            } else {
                sample.left = l * g.gain_l;
                sample.right = r + l * g.gain_r;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    fn run(pan: f32, input: StereoSample) -> StereoSample {
        let mut p = StereoPanner::new();
        p.set_pan(pan);
        let mut buf = StereoBuffer::from_vec(vec![input]);
        p.process(&mut buf);
        buf[0]
    }

    #[test]
    fn test_center_is_transparent() {
        let out = run(0.0, StereoSample::new(0.3, -0.7));
        assert!((out.left - 0.3).abs() < 1e-6);
        assert!((out.right + 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_hard_pans() {
        let left = run(-1.0, StereoSample::new(0.5, 0.5));
        assert!((left.left - 1.0).abs() < 1e-6);
        assert!(left.right.abs() < 1e-6);

        let right = run(1.0, StereoSample::new(0.5, 0.5));
        assert!(right.left.abs() < 1e-6);
        assert!((right.right - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut p = StereoPanner::new();
        p.set_pan(3.0);
        assert_eq!(p.pan(), 1.0);
    }
}
