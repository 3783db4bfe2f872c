//! Per-track level meters
//!
//! The level is a fader-position proxy: the gain the audio thread applied
//! at the end of the last block, scaled for display. Each reading also
//! carries the post-fader peak measured on the audio thread since the
//! previous sample.

use serde::Serialize;

use crate::types::{linear_to_db, TrackId};

use super::manager::AudioGraphManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelReading {
    pub id: TrackId,
    /// Applied gain times the display scale
    pub level: f32,
    /// Measured post-fader peak (linear)
    pub peak: f32,
    pub peak_db: f32,
}

pub struct LevelMeterSampler {
    scale: f32,
    readings: Vec<LevelReading>,
}

impl LevelMeterSampler {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            readings: Vec::new(),
        }
    }

    /// Take one reading per track; empty unless the engine is live
    pub fn sample(&mut self, graph: &AudioGraphManager) -> &[LevelReading] {
        self.readings.clear();
        if !graph.is_live() {
            return &self.readings;
        }

        self.readings.extend(graph.channel_readback().map(|(track, atomics)| {
            let peak = atomics.take_peak();
            LevelReading {
                id: track.id,
                level: atomics.gain() * self.scale,
                peak,
                peak_db: linear_to_db(peak),
            }
        }));
        &self.readings
    }

    /// Readings from the last `sample` call
    pub fn readings(&self) -> &[LevelReading] {
        &self.readings
    }

    pub fn reading(&self, id: TrackId) -> Option<&LevelReading> {
        self.readings.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessBackend;
    use crate::config::EngineConfig;
    use crate::engine::TrackConfig;
    use crate::graph::{GraphCommand, SineTone};

    #[test]
    fn test_no_readings_before_live() {
        let mut m = AudioGraphManager::new(EngineConfig::headless(), Box::new(HeadlessBackend::new()));
        m.create_track(&TrackConfig::default()).unwrap();
        let mut meters = LevelMeterSampler::new(100.0);
        assert!(meters.sample(&m).is_empty());
    }

    #[test]
    fn test_level_follows_applied_gain() {
        let backend = HeadlessBackend::new();
        let renderer = backend.renderer();
        let mut m = AudioGraphManager::new(EngineConfig::headless(), Box::new(backend));
        m.initialize().unwrap();
        let id = m.create_track(&TrackConfig::default()).unwrap();
        m.attach_source(id, Box::new(SineTone::new(220.0, 0.05))).unwrap();
        m.send(GraphCommand::SetRunning(true));
        renderer.render_blocks(4);

        let mut meters = LevelMeterSampler::new(100.0);
        let reading = meters.sample(&m)[0];
        assert_eq!(reading.id, id);
        assert!((reading.level - 75.0).abs() < 1e-3);
        assert!(reading.peak > 0.03 && reading.peak < 0.05);

        // Peak is cleared by the read
        assert_eq!(meters.sample(&m)[0].peak, 0.0);
    }
}
