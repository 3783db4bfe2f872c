//! Master bus compressor
//!
//! Feed-forward soft-knee compressor with a stereo-linked peak detector.
//! Settings are fixed when the master bus is built.
//!
//! # Algorithm
//!
//! 1. Detect the stereo peak of each frame and convert it to dBFS.
//! 2. Compute the static gain reduction from threshold, knee and ratio.
//! 3. Smooth the reduction with separate attack and release one-poles.
//! 4. Scale the frame by the smoothed gain.

use serde::{Deserialize, Serialize};

use crate::types::{db_to_linear, linear_to_db, StereoBuffer};

/// Compressor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorSettings {
    /// Threshold in dBFS
    pub threshold_db: f32,
    /// Knee width in dB
    pub knee_db: f32,
    /// Compression ratio (n:1)
    pub ratio: f32,
    /// Attack time in seconds
    pub attack_secs: f32,
    /// Release time in seconds
    pub release_secs: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_secs: 0.003,
            release_secs: 0.25,
        }
    }
}

impl CompressorSettings {
    /// Clamp every field into its usable range
    pub fn sanitized(self) -> Self {
        Self {
            threshold_db: self.threshold_db.clamp(-100.0, 0.0),
            knee_db: self.knee_db.clamp(0.0, 40.0),
            ratio: self.ratio.clamp(1.0, 20.0),
            attack_secs: self.attack_secs.clamp(0.0, 1.0),
            release_secs: self.release_secs.clamp(0.0, 1.0),
        }
    }
}

/// One-pole coefficient for a time constant; 0 means no smoothing
fn time_coeff(secs: f32, sample_rate: u32) -> f32 {
    if secs <= 0.0 {
        0.0
    } else {
        (-1.0 / (secs * sample_rate as f32)).exp()
    }
}

pub struct Compressor {
    settings: CompressorSettings,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed gain reduction in dB (positive = reducing)
    envelope_db: f32,
}

impl Compressor {
    pub fn new(settings: CompressorSettings, sample_rate: u32) -> Self {
        let settings = settings.sanitized();
        Self {
            attack_coeff: time_coeff(settings.attack_secs, sample_rate),
            release_coeff: time_coeff(settings.release_secs, sample_rate),
            settings,
            envelope_db: 0.0,
        }
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.settings
    }

    /// Current gain reduction in dB
    pub fn reduction_db(&self) -> f32 {
        self.envelope_db
    }

    /// Static curve: dB of reduction for an input level
    pub fn compute_gain_reduction(&self, input_db: f32) -> f32 {
        let CompressorSettings { threshold_db, knee_db, ratio, .. } = self.settings;
        let slope = 1.0 - 1.0 / ratio;
        let half_knee = knee_db / 2.0;

        if knee_db <= 0.0 || input_db > threshold_db + half_knee {
            (input_db - threshold_db).max(0.0) * slope
        } else if input_db < threshold_db - half_knee {
            0.0
        } else {
            let knee_input = input_db - threshold_db + half_knee;
            (knee_input * knee_input) / (2.0 * knee_db) * slope
        }
    }

    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for sample in buffer.iter_mut() {
            let target = self.compute_gain_reduction(linear_to_db(sample.peak()));
            let coeff = if target > self.envelope_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope_db = target + coeff * (self.envelope_db - target);

            if self.envelope_db > 1e-4 {
                *sample *= db_to_linear(-self.envelope_db);
            }
        }
    }

    pub fn reset(&mut self) {
        self.envelope_db = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StereoSample, SAMPLE_RATE};

    #[test]
    fn test_defaults() {
        let s = CompressorSettings::default();
        assert_eq!(s.threshold_db, -24.0);
        assert_eq!(s.knee_db, 30.0);
        assert_eq!(s.ratio, 12.0);
        assert_eq!(s.attack_secs, 0.003);
        assert_eq!(s.release_secs, 0.25);
    }

    #[test]
    fn test_static_curve() {
        let c = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        // Well below the knee
        assert_eq!(c.compute_gain_reduction(-60.0), 0.0);
        // Above the knee: (0 - -24) * (1 - 1/12) = 22 dB
        assert!((c.compute_gain_reduction(0.0) - 22.0).abs() < 1e-3);
        // Inside the knee the curve is continuous and increasing
        let a = c.compute_gain_reduction(-30.0);
        let b = c.compute_gain_reduction(-20.0);
        assert!(a > 0.0 && b > a);
    }

    #[test]
    fn test_quiet_signal_untouched() {
        let mut c = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        let mut buf = StereoBuffer::from_vec(vec![StereoSample::mono(0.001); 256]);
        c.process(&mut buf);
        assert!(buf.iter().all(|s| (s.left - 0.001).abs() < 1e-7));
    }

    #[test]
    fn test_loud_signal_reduced() {
        let mut c = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        let mut buf = StereoBuffer::from_vec(vec![StereoSample::mono(1.0); 4800]);
        c.process(&mut buf);
        assert!(buf[4799].left < 0.2);
        assert!(c.reduction_db() > 15.0);
    }
}
