//! Three-band channel equalizer
//!
//! High shelf → mid peak → low shelf, in that order, each a stereo biquad.
//! Band gains are in dB; a band within ±0.05 dB of flat is a passthrough.

use serde::{Deserialize, Serialize};

use crate::types::StereoBuffer;

/// Low shelf corner frequency
const EQ_LOW_FREQ: f32 = 320.0;
/// Mid peak center frequency
const EQ_MID_FREQ: f32 = 1000.0;
/// High shelf corner frequency
const EQ_HIGH_FREQ: f32 = 3200.0;
/// Q for the mid band
const EQ_MID_Q: f32 = 0.7;
/// Shelf slope (S) used by both shelves
const SHELF_SLOPE: f32 = 0.9;

/// Equalizer band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqBand {
    High,
    Mid,
    Low,
}

impl EqBand {
    /// All bands in signal-chain order
    pub const ALL: [EqBand; 3] = [EqBand::High, EqBand::Mid, EqBand::Low];

    pub fn name(&self) -> &'static str {
        match self {
            EqBand::High => "high",
            EqBand::Mid => "mid",
            EqBand::Low => "low",
        }
    }
}

impl std::str::FromStr for EqBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" | "hi" => Ok(EqBand::High),
            "mid" => Ok(EqBand::Mid),
            "low" | "lo" => Ok(EqBand::Low),
            other => Err(format!("unknown EQ band '{}'", other)),
        }
    }
}

/// Biquad filter state (stereo, direct form I)
#[derive(Debug, Clone, Default)]
struct BiquadState {
    x1_l: f32, x2_l: f32, y1_l: f32, y2_l: f32,
    x1_r: f32, x2_r: f32, y1_r: f32, y2_r: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input_l: f32, input_r: f32, c: &BiquadCoeffs) -> (f32, f32) {
        let out_l = c.b0 * input_l + c.b1 * self.x1_l + c.b2 * self.x2_l
                  - c.a1 * self.y1_l - c.a2 * self.y2_l;
        self.x2_l = self.x1_l;
        self.x1_l = input_l;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let out_r = c.b0 * input_r + c.b1 * self.x1_r + c.b2 * self.x2_r
                  - c.a1 * self.y1_r - c.a2 * self.y2_r;
        self.x2_r = self.x1_r;
        self.x1_r = input_r;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l, out_r)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
}

impl BiquadCoeffs {
    /// Low shelf: boost/cut below `freq`
    pub fn low_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt();

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        Self {
            b0: (a * ((a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha)) / a0,
            b1: (2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha)) / a0,
            a1: (-2.0 * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha) / a0,
        }
    }

    /// Peaking filter around `freq`
    pub fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// High shelf: boost/cut above `freq`
    pub fn high_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt();

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        Self {
            b0: (a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha)) / a0,
            b1: (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha)) / a0,
            a1: (2.0 * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha) / a0,
        }
    }

    /// Passthrough (unity gain, no filtering)
    pub fn passthrough() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }

    /// Magnitude response at `freq` (linear)
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Three-band stereo equalizer
pub struct ThreeBandEq {
    sample_rate: f32,
    gains_db: [f32; 3],
    coeffs: [BiquadCoeffs; 3],
    states: [BiquadState; 3],
}

impl ThreeBandEq {
    /// Create a flat equalizer
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            gains_db: [0.0; 3],
            coeffs: std::array::from_fn(|_| BiquadCoeffs::passthrough()),
            states: std::array::from_fn(|_| BiquadState::default()),
        }
    }

    fn index(band: EqBand) -> usize {
        match band {
            EqBand::High => 0,
            EqBand::Mid => 1,
            EqBand::Low => 2,
        }
    }

    /// Set one band's gain in dB and recompute its coefficients
    pub fn set_gain(&mut self, band: EqBand, gain_db: f32) {
        let idx = Self::index(band);
        self.gains_db[idx] = gain_db;
        let sr = self.sample_rate;
        self.coeffs[idx] = if gain_db.abs() <= 0.05 {
            BiquadCoeffs::passthrough()
        } else {
            match band {
                EqBand::High => BiquadCoeffs::high_shelf(EQ_HIGH_FREQ, gain_db, sr),
                EqBand::Mid => BiquadCoeffs::peaking(EQ_MID_FREQ, gain_db, EQ_MID_Q, sr),
                EqBand::Low => BiquadCoeffs::low_shelf(EQ_LOW_FREQ, gain_db, sr),
            }
        };
    }

    /// Current gain of a band in dB
    pub fn gain(&self, band: EqBand) -> f32 {
        self.gains_db[Self::index(band)]
    }

    /// Coefficients of a band (for response plots and tests)
    pub fn coeffs(&self, band: EqBand) -> &BiquadCoeffs {
        &self.coeffs[Self::index(band)]
    }

    /// Process a buffer in place, high → mid → low
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for sample in buffer.iter_mut() {
            let (mut left, mut right) = (sample.left, sample.right);
            for (state, coeffs) in self.states.iter_mut().zip(self.coeffs.iter()) {
                (left, right) = state.process(left, right, coeffs);
            }
            sample.left = left;
            sample.right = right;
        }
    }

    /// Reset all filter states
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StereoSample, SAMPLE_RATE};

    #[test]
    fn test_flat_eq_is_passthrough() {
        let mut eq = ThreeBandEq::new(SAMPLE_RATE);
        let mut buf = StereoBuffer::from_vec(vec![StereoSample::new(0.5, -0.25); 16]);
        eq.process(&mut buf);
        for s in buf.iter() {
            assert_eq!(*s, StereoSample::new(0.5, -0.25));
        }
    }

    #[test]
    fn test_low_shelf_boosts_bass_only() {
        let mut eq = ThreeBandEq::new(SAMPLE_RATE);
        eq.set_gain(EqBand::Low, 12.0);
        let c = eq.coeffs(EqBand::Low);
        let sr = SAMPLE_RATE as f32;
        let at_40hz = c.magnitude_at(40.0, sr);
        let at_10k = c.magnitude_at(10_000.0, sr);
        assert!(at_40hz > 3.0, "expected ~+12 dB at 40 Hz, got {}", at_40hz);
        assert!((at_10k - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_high_shelf_cut() {
        let mut eq = ThreeBandEq::new(SAMPLE_RATE);
        eq.set_gain(EqBand::High, -12.0);
        let c = eq.coeffs(EqBand::High);
        assert!(c.magnitude_at(15_000.0, SAMPLE_RATE as f32) < 0.4);
        assert!((c.magnitude_at(50.0, SAMPLE_RATE as f32) - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_mid_peak_centered() {
        let mut eq = ThreeBandEq::new(SAMPLE_RATE);
        eq.set_gain(EqBand::Mid, 6.0);
        let c = eq.coeffs(EqBand::Mid);
        let peak = c.magnitude_at(EQ_MID_FREQ, SAMPLE_RATE as f32);
        assert!((peak - 2.0).abs() < 0.05);
        assert_eq!(eq.gain(EqBand::Mid), 6.0);
    }

    #[test]
    fn test_band_parsing() {
        assert_eq!("HIGH".parse::<EqBand>().unwrap(), EqBand::High);
        assert_eq!("lo".parse::<EqBand>().unwrap(), EqBand::Low);
        assert!("treble".parse::<EqBand>().is_err());
    }
}
