//! Track model
//!
//! The authoritative, control-side record of a track. Values here are
//! always inside their declared domains; the audio thread only ever sees
//! copies sent through the command queue.

use serde::{Deserialize, Serialize};

use super::error::EngineResult;
use super::params::{EFFECT_MIX, EQ_GAIN, PAN, VOLUME};
use crate::dsp::EqBand;
use crate::graph::{SendEffect, StripParams};
use crate::types::TrackId;

/// Volume of a track created without configuration
pub const DEFAULT_VOLUME: f32 = 0.75;

/// Track type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Audio,
    Instrument,
    Drums,
    Vocals,
}

impl TrackKind {
    /// Display color used when a track has none configured
    pub fn default_color(&self) -> &'static str {
        match self {
            TrackKind::Audio => "#4f9dff",
            TrackKind::Instrument => "#b36bff",
            TrackKind::Drums => "#ff7a45",
            TrackKind::Vocals => "#3ecf8e",
        }
    }
}

/// Three-band EQ gains in dB
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EqSettings {
    pub high: f32,
    pub mid: f32,
    pub low: f32,
}

impl EqSettings {
    pub fn get(&self, band: EqBand) -> f32 {
        match band {
            EqBand::High => self.high,
            EqBand::Mid => self.mid,
            EqBand::Low => self.low,
        }
    }

    pub fn set(&mut self, band: EqBand, gain_db: f32) {
        match band {
            EqBand::High => self.high = gain_db,
            EqBand::Mid => self.mid = gain_db,
            EqBand::Low => self.low = gain_db,
        }
    }

    /// Gains in signal-chain order (high, mid, low)
    pub fn as_array(&self) -> [f32; 3] {
        [self.high, self.mid, self.low]
    }
}

/// Send effect mixes in percent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub reverb: f32,
    pub delay: f32,
}

impl EffectSettings {
    pub fn get(&self, effect: SendEffect) -> f32 {
        match effect {
            SendEffect::Reverb => self.reverb,
            SendEffect::Delay => self.delay,
        }
    }

    pub fn set(&mut self, effect: SendEffect, percent: f32) {
        match effect {
            SendEffect::Reverb => self.reverb = percent,
            SendEffect::Delay => self.delay = percent,
        }
    }
}

/// Optional settings for a new track; anything left out takes the default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub id: Option<TrackId>,
    pub name: Option<String>,
    pub kind: Option<TrackKind>,
    pub color: Option<String>,
    pub volume: Option<f32>,
    pub pan: Option<f32>,
    pub eq: Option<EqSettings>,
    pub effects: Option<EffectSettings>,
}

impl TrackConfig {
    pub fn named(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: TrackId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = Some(pan);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    pub color: String,
    pub volume: f32,
    pub pan: f32,
    pub eq: EqSettings,
    pub effects: EffectSettings,
    pub is_solo: bool,
    pub is_muted: bool,
}

impl Track {
    /// Build a track from a config, validating every supplied value strictly
    pub fn from_config(id: TrackId, config: &TrackConfig) -> EngineResult<Self> {
        let kind = config.kind.unwrap_or_default();
        let volume = VOLUME.validate(config.volume.unwrap_or(DEFAULT_VOLUME))?;
        let pan = PAN.validate(config.pan.unwrap_or(0.0))?;

        let eq = config.eq.unwrap_or_default();
        for band in EqBand::ALL {
            EQ_GAIN.validate(eq.get(band))?;
        }
        let effects = config.effects.unwrap_or_default();
        for effect in SendEffect::ALL {
            EFFECT_MIX.validate(effects.get(effect))?;
        }

        Ok(Self {
            id,
            name: config
                .name
                .clone()
                .unwrap_or_else(|| format!("Track {}", id)),
            kind,
            color: config
                .color
                .clone()
                .unwrap_or_else(|| kind.default_color().to_string()),
            volume,
            pan,
            eq,
            effects,
            is_solo: false,
            is_muted: false,
        })
    }

    /// Gain the graph should apply given whether any track is soloed
    ///
    /// Mute wins over solo on the same track.
    pub fn effective_gain(&self, any_solo: bool) -> f32 {
        if self.is_muted || (any_solo && !self.is_solo) {
            0.0
        } else {
            self.volume
        }
    }

    /// Whether the track would be heard given the session's solo state
    pub fn is_audible(&self, any_solo: bool) -> bool {
        self.effective_gain(any_solo) > 0.0
    }

    /// Strip parameters for building this track's audio-thread chain
    pub fn strip_params(&self, any_solo: bool) -> StripParams {
        StripParams {
            gain: self.effective_gain(any_solo),
            pan: self.pan,
            eq_db: self.eq.as_array(),
            sends: [self.effects.reverb / 100.0, self.effects.delay / 100.0],
        }
    }
}
