//! Per-track parameter surface
//!
//! Every setter writes the stored value first, then applies it to the graph
//! at the current instant. Values are resolved through the caller's policy
//! tier: `Ui` clamps (NaN is ignored), `Api` rejects with the track left
//! unchanged.

use crate::dsp::EqBand;
use crate::graph::{GraphCommand, SendEffect};
use crate::types::TrackId;

use super::error::EngineResult;
use super::manager::AudioGraphManager;
use super::params::{ControlSource, EFFECT_MIX, EQ_GAIN, PAN, VOLUME};
use super::track::Track;

pub struct ChannelStrip<'a> {
    manager: &'a mut AudioGraphManager,
    id: TrackId,
}

impl<'a> ChannelStrip<'a> {
    pub(crate) fn new(manager: &'a mut AudioGraphManager, id: TrackId) -> Self {
        Self { manager, id }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Stored state of the track
    pub fn track(&self) -> Option<&Track> {
        self.manager.track(self.id)
    }

    /// Linear volume 0..1
    ///
    /// Mute and solo are applied on top; the stored volume is never altered
    /// by them.
    pub fn set_volume(&mut self, value: f32, source: ControlSource) -> EngineResult<()> {
        let Some(volume) = VOLUME.resolve(value, source)? else {
            return Ok(());
        };
        self.manager.track_mut(self.id)?.volume = volume;
        self.manager.apply_gain(self.id, 0);
        log::debug!("Track {} volume {:.3}", self.id, volume);
        Ok(())
    }

    /// Stereo position -1 (left) .. 1 (right)
    pub fn set_pan(&mut self, value: f32, source: ControlSource) -> EngineResult<()> {
        let Some(pan) = PAN.resolve(value, source)? else {
            return Ok(());
        };
        self.manager.track_mut(self.id)?.pan = pan;
        self.manager.send(GraphCommand::SetPan { id: self.id, pan });
        log::debug!("Track {} pan {:.3}", self.id, pan);
        Ok(())
    }

    /// Band gain in dB, -12 .. +12
    pub fn set_eq_band(&mut self, band: EqBand, value: f32, source: ControlSource) -> EngineResult<()> {
        let Some(gain_db) = EQ_GAIN.resolve(value, source)? else {
            return Ok(());
        };
        self.manager.track_mut(self.id)?.eq.set(band, gain_db);
        self.manager.send(GraphCommand::SetEq { id: self.id, band, gain_db });
        log::debug!("Track {} EQ {} {:+.1} dB", self.id, band.name(), gain_db);
        Ok(())
    }

    /// Send effect mix in percent, 0 .. 100
    pub fn set_effect_mix(
        &mut self,
        effect: SendEffect,
        value: f32,
        source: ControlSource,
    ) -> EngineResult<()> {
        let Some(percent) = EFFECT_MIX.resolve(value, source)? else {
            return Ok(());
        };
        self.manager.track_mut(self.id)?.effects.set(effect, percent);
        self.manager.send(GraphCommand::SetSend {
            id: self.id,
            effect,
            level: percent / 100.0,
        });
        log::debug!("Track {} {} {:.0}%", self.id, effect.name(), percent);
        Ok(())
    }

    pub fn rename(&mut self, name: impl Into<String>) -> EngineResult<()> {
        self.manager.track_mut(self.id)?.name = name.into();
        Ok(())
    }
}
