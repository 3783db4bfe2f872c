//! Control side of the mixer
//!
//! `MixEngine` ties the pieces together:
//!
//! - `AudioGraphManager`: output lifecycle, track records, command queue
//! - `ChannelStrip`: per-track volume, pan, EQ and send setters
//! - `SoloMuteCoordinator`: solo/mute flags and effective gains
//! - `LevelMeterSampler`: per-tick level readback
//! - `Analyzer` / `AnalysisRenderer`: master bus snapshots and their views
//! - `TransportController`: play/pause/stop on the audio clock
//! - `ControlCommand`: the single dispatch entry for control events

mod analysis;
mod analyzer;
mod channel;
mod dispatch;
mod engine;
mod error;
mod manager;
mod meter;
mod params;
mod scheduler;
mod session;
mod solo;
mod track;
mod transport;

pub use analysis::{
    AnalysisRenderer, AnalysisView, Color, DisplayList, DrawOp, RenderSurface, HISTOGRAM_BANDS,
};
pub use analyzer::{Analyzer, AnalyzerSnapshot};
pub use channel::ChannelStrip;
pub use dispatch::{CommandOutcome, ControlCommand, ParseError};
pub use engine::MixEngine;
pub use error::{EngineError, EngineResult};
pub use manager::{AudioGraphManager, Lifecycle};
pub use meter::{LevelMeterSampler, LevelReading};
pub use params::{ControlSource, ParamRange, EFFECT_MIX, EQ_GAIN, MASTER_GAIN, PAN, VOLUME};
pub use scheduler::{DueEvent, LookaheadScheduler};
pub use session::{SessionState, TrackState};
pub use solo::SoloMuteCoordinator;
pub use track::{EffectSettings, EqSettings, Track, TrackConfig, TrackKind, DEFAULT_VOLUME};
pub use transport::{TransportController, TransportState, TransportStatus};
