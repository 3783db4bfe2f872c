//! Solo and mute coordination
//!
//! Any flag change recomputes the effective gain of every track and ramps
//! each one over the configured solo/mute ramp. Mute wins over solo on the
//! same track, and neither flag ever touches the stored volume.

use crate::types::TrackId;

use super::error::EngineResult;
use super::manager::AudioGraphManager;

pub struct SoloMuteCoordinator<'a> {
    manager: &'a mut AudioGraphManager,
}

impl<'a> SoloMuteCoordinator<'a> {
    pub(crate) fn new(manager: &'a mut AudioGraphManager) -> Self {
        Self { manager }
    }

    /// Flip a track's solo flag; returns the new state
    pub fn toggle_solo(&mut self, id: TrackId) -> EngineResult<bool> {
        let track = self.manager.track_mut(id)?;
        track.is_solo = !track.is_solo;
        let solo = track.is_solo;
        log::debug!("Track {} solo {}", id, if solo { "on" } else { "off" });
        self.reapply();
        Ok(solo)
    }

    /// Flip a track's mute flag; returns the new state
    pub fn toggle_mute(&mut self, id: TrackId) -> EngineResult<bool> {
        let track = self.manager.track_mut(id)?;
        track.is_muted = !track.is_muted;
        let muted = track.is_muted;
        log::debug!("Track {} mute {}", id, if muted { "on" } else { "off" });
        self.reapply();
        Ok(muted)
    }

    /// Drop every solo flag
    pub fn clear_solo(&mut self) {
        let soloed = self.soloed();
        if soloed.is_empty() {
            return;
        }
        for id in soloed {
            if let Ok(track) = self.manager.track_mut(id) {
                track.is_solo = false;
            }
        }
        self.reapply();
    }

    pub fn soloed(&self) -> Vec<TrackId> {
        self.manager
            .tracks()
            .filter(|t| t.is_solo)
            .map(|t| t.id)
            .collect()
    }

    pub fn effective_gain(&self, id: TrackId) -> Option<f32> {
        self.manager.effective_gain(id)
    }

    fn reapply(&mut self) {
        let ramp = self.manager.ramp_frames();
        self.manager.apply_all_gains(ramp);
    }
}
