//! Session snapshots for the persistence collaborator
//!
//! Only the mix parameters are captured. Restoring goes through the normal
//! channel strip setters under strict validation, so a snapshot with bad
//! values is applied field by field and every rejected field is reported.

use serde::{Deserialize, Serialize};

use crate::dsp::EqBand;
use crate::graph::SendEffect;
use crate::types::TrackId;

use super::error::{EngineError, EngineResult};
use super::manager::AudioGraphManager;
use super::params::ControlSource;
use super::track::{EffectSettings, EqSettings, Track};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub id: TrackId,
    pub volume: f32,
    pub pan: f32,
    pub eq: EqSettings,
    pub effects: EffectSettings,
}

impl From<&Track> for TrackState {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            volume: track.volume,
            pan: track.pan,
            eq: track.eq,
            effects: track.effects,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub tracks: Vec<TrackState>,
}

impl SessionState {
    pub fn capture(graph: &AudioGraphManager) -> Self {
        Self {
            tracks: graph.tracks().map(TrackState::from).collect(),
        }
    }

    /// Re-apply every field; returns the fields that were rejected
    pub fn restore(&self, graph: &mut AudioGraphManager) -> Vec<EngineError> {
        let mut errors = Vec::new();
        for state in &self.tracks {
            if let Err(e) = restore_track(graph, state, &mut errors) {
                errors.push(e);
            }
        }
        for e in &errors {
            log::warn!("Session restore: {}", e);
        }
        errors
    }
}

fn restore_track(
    graph: &mut AudioGraphManager,
    state: &TrackState,
    errors: &mut Vec<EngineError>,
) -> EngineResult<()> {
    let mut strip = graph.channel(state.id)?;
    let source = ControlSource::Api;

    let mut results = vec![
        strip.set_volume(state.volume, source),
        strip.set_pan(state.pan, source),
    ];
    for band in EqBand::ALL {
        results.push(strip.set_eq_band(band, state.eq.get(band), source));
    }
    for effect in SendEffect::ALL {
        results.push(strip.set_effect_mix(effect, state.effects.get(effect), source));
    }
    errors.extend(results.into_iter().filter_map(Result::err));
    Ok(())
}
