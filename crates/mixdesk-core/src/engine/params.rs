//! Parameter domains and the two input policy tiers
//!
//! Interactive controls (faders, knobs) clamp: an out-of-range drag lands
//! on the limit and a NaN is ignored. Programmatic callers get strict
//! validation and an error for anything outside the domain.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Who issued a parameter change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlSource {
    /// Interactive control: clamp silently, ignore NaN
    #[default]
    Ui,
    /// Programmatic call: reject out-of-domain values
    Api,
}

/// Closed numeric domain of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(name: &'static str, min: f32, max: f32) -> Self {
        Self { name, min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Resolve an incoming value under a policy tier
    ///
    /// `Ok(None)` means the value is ignored and nothing changes.
    pub fn resolve(&self, value: f32, source: ControlSource) -> EngineResult<Option<f32>> {
        match source {
            ControlSource::Ui if value.is_nan() => Ok(None),
            ControlSource::Ui => Ok(Some(value.clamp(self.min, self.max))),
            ControlSource::Api if self.contains(value) => Ok(Some(value)),
            ControlSource::Api => Err(self.invalid(value)),
        }
    }

    /// Strict validation (Api tier)
    pub fn validate(&self, value: f32) -> EngineResult<f32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(self.invalid(value))
        }
    }

    fn invalid(&self, value: f32) -> EngineError {
        EngineError::InvalidParameter {
            param: self.name,
            value,
            min: self.min,
            max: self.max,
        }
    }
}

/// Track volume (linear gain)
pub const VOLUME: ParamRange = ParamRange::new("volume", 0.0, 1.0);
/// Stereo position, -1 = hard left
pub const PAN: ParamRange = ParamRange::new("pan", -1.0, 1.0);
/// EQ band gain in dB
pub const EQ_GAIN: ParamRange = ParamRange::new("eq gain", -12.0, 12.0);
/// Send effect mix in percent
pub const EFFECT_MIX: ParamRange = ParamRange::new("effect mix", 0.0, 100.0);
/// Master output gain (linear)
pub const MASTER_GAIN: ParamRange = ParamRange::new("master gain", 0.0, 1.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_tier_clamps() {
        assert_eq!(PAN.resolve(1.5, ControlSource::Ui), Ok(Some(1.0)));
        assert_eq!(EQ_GAIN.resolve(-40.0, ControlSource::Ui), Ok(Some(-12.0)));
        assert_eq!(VOLUME.resolve(0.3, ControlSource::Ui), Ok(Some(0.3)));
    }

    #[test]
    fn test_ui_tier_ignores_nan() {
        assert_eq!(VOLUME.resolve(f32::NAN, ControlSource::Ui), Ok(None));
    }

    #[test]
    fn test_api_tier_rejects() {
        let err = PAN.resolve(1.5, ControlSource::Api).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidParameter { param: "pan", value: 1.5, min: -1.0, max: 1.0 }
        );
        assert!(EFFECT_MIX.resolve(f32::NAN, ControlSource::Api).is_err());
        assert_eq!(EFFECT_MIX.resolve(100.0, ControlSource::Api), Ok(Some(100.0)));
    }
}
