//! Engine configuration
//!
//! One YAML document covering the output, the master bus, controller
//! constants and the session's default tracks. Every section has defaults,
//! so a partial file only overrides what it names.
//!
//! ```yaml
//! audio:
//!   backend: cpal
//!   buffer_size: !Fixed 256
//! master:
//!   compressor:
//!     threshold_db: -18.0
//! transport:
//!   duration_secs: 120.0
//! ```

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::dsp::CompressorSettings;
use crate::engine::{TrackConfig, TrackKind};

/// Solo/mute ramp bounds in milliseconds
pub const RAMP_MS_RANGE: (f32, f32) = (5.0, 10.0);

/// Master bus settings, fixed at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub compressor: CompressorSettings,
    /// Initial master gain (0..1)
    pub gain: f32,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            compressor: CompressorSettings::default(),
            gain: 1.0,
        }
    }
}

/// Master analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// FFT length; half of it is the number of frequency bins
    pub fft_size: usize,
    /// Time-domain samples kept for the waveform view
    pub history_size: usize,
    /// Spectral smoothing between snapshots (0..1)
    pub smoothing: f32,
    /// dB mapped to magnitude 0
    pub min_db: f32,
    /// dB mapped to magnitude 255
    pub max_db: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            history_size: 1024,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Transport and scheduler timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Length of the session; playback stops on reaching it
    pub duration_secs: f64,
    /// Scheduler tick interval
    pub tick_ms: u32,
    /// How far ahead of the audio clock events are handed to the graph
    pub lookahead_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            duration_secs: 240.0,
            tick_ms: 25,
            lookahead_ms: 100,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub master: MasterConfig,
    /// Gain ramp applied on solo/mute changes
    pub ramp_ms: f32,
    /// Display scale applied to channel gains by the level meters
    pub meter_scale: f32,
    pub analyzer: AnalyzerConfig,
    pub transport: TransportConfig,
    /// Tracks created when the engine is constructed
    pub default_tracks: Vec<TrackConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            master: MasterConfig::default(),
            ramp_ms: 8.0,
            meter_scale: 100.0,
            analyzer: AnalyzerConfig::default(),
            transport: TransportConfig::default(),
            default_tracks: default_session(),
        }
    }
}

/// The starter session: one track per kind
pub fn default_session() -> Vec<TrackConfig> {
    vec![
        TrackConfig::named("Drums", TrackKind::Drums),
        TrackConfig::named("Bass", TrackKind::Instrument),
        TrackConfig::named("Keys", TrackKind::Instrument),
        TrackConfig::named("Vocals", TrackKind::Vocals),
    ]
}

impl EngineConfig {
    /// Defaults with the headless backend and no starter tracks
    pub fn headless() -> Self {
        Self {
            audio: AudioConfig::headless(),
            default_tracks: Vec::new(),
            ..Default::default()
        }
    }

    /// Replace unusable values with the nearest usable ones
    pub fn validated(mut self) -> Self {
        let (min_ramp, max_ramp) = RAMP_MS_RANGE;
        if !(min_ramp..=max_ramp).contains(&self.ramp_ms) {
            log::warn!(
                "ramp_ms {} outside [{}, {}], clamping",
                self.ramp_ms,
                min_ramp,
                max_ramp
            );
            self.ramp_ms = if self.ramp_ms.is_nan() {
                EngineConfig::default().ramp_ms
            } else {
                self.ramp_ms.clamp(min_ramp, max_ramp)
            };
        }

        let analyzer = &mut self.analyzer;
        if !analyzer.fft_size.is_power_of_two() || analyzer.fft_size < 32 {
            let fixed = analyzer.fft_size.clamp(32, 32768).next_power_of_two();
            log::warn!("fft_size {} is not a power of two >= 32, using {}", analyzer.fft_size, fixed);
            analyzer.fft_size = fixed;
        }
        analyzer.history_size = analyzer.history_size.max(analyzer.fft_size);
        analyzer.smoothing = analyzer.smoothing.clamp(0.0, 1.0);
        if analyzer.max_db <= analyzer.min_db {
            log::warn!("analyzer max_db must exceed min_db, restoring defaults");
            let defaults = AnalyzerConfig::default();
            analyzer.min_db = defaults.min_db;
            analyzer.max_db = defaults.max_db;
        }

        let transport = &mut self.transport;
        transport.tick_ms = transport.tick_ms.max(1);
        if !transport.duration_secs.is_finite() || transport.duration_secs <= 0.0 {
            transport.duration_secs = TransportConfig::default().duration_secs;
        }

        self.master.gain = self.master.gain.clamp(0.0, 1.0);
        self.master.compressor = self.master.compressor.sanitized();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ramp_ms, 8.0);
        assert_eq!(config.meter_scale, 100.0);
        assert_eq!(config.analyzer.bin_count(), 256);
        assert_eq!(config.analyzer.history_size, 1024);
        assert_eq!(config.transport.tick_ms, 25);
        assert_eq!(config.default_tracks.len(), 4);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "ramp_ms: 6.0\ntransport:\n  duration_secs: 30.0\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.ramp_ms, 6.0);
        assert_eq!(config.transport.duration_secs, 30.0);
        assert_eq!(config.transport.tick_ms, 25);
        assert_eq!(config.master.compressor.ratio, 12.0);
    }

    #[test]
    fn test_validation_repairs_values() {
        let mut config = EngineConfig::headless();
        config.ramp_ms = 50.0;
        config.analyzer.fft_size = 500;
        config.analyzer.min_db = -10.0;
        config.transport.duration_secs = -1.0;

        let config = config.validated();
        assert_eq!(config.ramp_ms, 10.0);
        assert_eq!(config.analyzer.fft_size, 512);
        assert_eq!(config.analyzer.min_db, -100.0);
        assert_eq!(config.transport.duration_secs, 240.0);
    }

    #[test]
    fn test_infinite_duration_restores_default() {
        let yaml = "transport:\n  duration_secs: .inf\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.transport.duration_secs.is_infinite());
        assert_eq!(config.validated().transport.duration_secs, 240.0);
    }

    #[test]
    fn test_yaml_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        let mut config = EngineConfig::headless();
        config.meter_scale = 50.0;

        crate::config::save_config(&config, &path).unwrap();
        let loaded: EngineConfig = crate::config::load_config(&path);
        assert_eq!(loaded, config);
    }
}
