//! Linear gain ramps
//!
//! Applies a target gain either instantly or over a fixed number of frames.
//! The ramp is per sample so block size does not change its length.

use crate::types::StereoBuffer;

/// Gain with an optional linear ramp toward a target
#[derive(Debug, Clone)]
pub struct GainSmoother {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl GainSmoother {
    pub fn new(gain: f32) -> Self {
        Self {
            current: gain,
            target: gain,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Move to `target`, reaching it after `ramp_frames` samples (0 = now)
    pub fn set_target(&mut self, target: f32, ramp_frames: u32) {
        self.target = target;
        if ramp_frames == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / ramp_frames as f32;
            self.remaining = ramp_frames;
        }
    }

    /// Gain at the current sample position
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    /// Scale a buffer, advancing the ramp one step per frame
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        if !self.is_ramping() {
            let gain = self.current;
            if gain != 1.0 {
                buffer.scale(gain);
            }
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.next();
        }
    }
}

/// Frames covered by a ramp of `ms` milliseconds
pub fn ramp_frames(ms: f32, sample_rate: u32) -> u32 {
    (ms.max(0.0) * sample_rate as f32 / 1000.0).round() as u32
}
