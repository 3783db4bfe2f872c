//! The mixing engine
//!
//! `MixEngine` is the explicit engine instance: one per session, built
//! once, driven through `initialize` → operations → `dispose`. It owns
//! the graph manager and the controllers and lends the manager to each
//! controller per call.
//!
//! Parameter setters take a `ControlSource` choosing the policy tier. After
//! `dispose` every operation is a no-op.
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = MixEngine::new(EngineConfig::default())?;
//! engine.initialize()?;
//! let id = engine.add_track(TrackConfig::default())?;
//! engine.set_volume(id, 0.5, ControlSource::Ui)?;
//! engine.play()?;
//! loop {
//!     engine.tick(Some(&mut surface));
//!     // read engine.meters(), engine.analysis()
//! }
//! ```

use crate::audio::{create_backend, AudioBackend, StreamInfo};
use crate::config::EngineConfig;
use crate::dsp::EqBand;
use crate::graph::{SendEffect, SignalSource};
use crate::types::TrackId;

use super::analysis::{AnalysisRenderer, AnalysisView, RenderSurface};
use super::analyzer::AnalyzerSnapshot;
use super::error::{EngineError, EngineResult};
use super::manager::{AudioGraphManager, Lifecycle};
use super::meter::{LevelMeterSampler, LevelReading};
use super::params::{ControlSource, MASTER_GAIN};
use super::session::SessionState;
use super::track::{Track, TrackConfig};
use super::transport::{TransportController, TransportState, TransportStatus};

pub struct MixEngine {
    graph: AudioGraphManager,
    transport: TransportController,
    meters: LevelMeterSampler,
    renderer: AnalysisRenderer,
}

impl MixEngine {
    /// Build an engine on the backend selected by `config.audio.backend`
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let backend = create_backend(config.audio.backend);
        Self::with_backend(config, backend)
    }

    /// Build an engine on a caller-supplied backend
    ///
    /// The configured default tracks are created immediately; the output is
    /// not touched until `initialize`.
    pub fn with_backend(config: EngineConfig, backend: Box<dyn AudioBackend>) -> EngineResult<Self> {
        let graph = AudioGraphManager::new(config, backend);
        let config = graph.config().clone();

        let mut engine = Self {
            transport: TransportController::new(&config.transport, graph.sample_rate()),
            meters: LevelMeterSampler::new(config.meter_scale),
            renderer: AnalysisRenderer::new(),
            graph,
        };
        for track in &config.default_tracks {
            engine.graph.create_track(track)?;
        }
        log::info!("Mix engine created with {} tracks", engine.graph.track_count());
        Ok(engine)
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    pub fn initialize(&mut self) -> EngineResult<()> {
        self.graph.initialize()
    }

    /// Stop the transport and tear down the graph; repeated calls are no-ops
    pub fn dispose(&mut self) {
        if self.graph.is_disposed() {
            return;
        }
        self.transport.stop(&mut self.graph);
        self.graph.dispose();
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        self.graph.lifecycle()
    }

    pub fn is_live(&self) -> bool {
        self.graph.is_live()
    }

    pub fn is_disposed(&self) -> bool {
        self.graph.is_disposed()
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.graph.stream_info()
    }

    pub fn graph(&self) -> &AudioGraphManager {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraphManager {
        &mut self.graph
    }

    // ─────────────────────────────────────────────────────────────
    // Tracks
    // ─────────────────────────────────────────────────────────────

    pub fn add_track(&mut self, config: TrackConfig) -> EngineResult<TrackId> {
        self.graph.create_track(&config)
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        self.graph.remove_track(id)
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.graph.channel(id)?.rename(name)
    }

    pub fn attach_source(&mut self, id: TrackId, source: Box<dyn SignalSource>) -> EngineResult<()> {
        self.graph.attach_source(id, source)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.graph.track(id)
    }

    pub fn tracks(&self) -> Vec<&Track> {
        self.graph.tracks().collect()
    }

    pub fn effective_gain(&self, id: TrackId) -> Option<f32> {
        self.graph.effective_gain(id)
    }

    // ─────────────────────────────────────────────────────────────
    // Channel strip
    // ─────────────────────────────────────────────────────────────

    pub fn set_volume(&mut self, id: TrackId, value: f32, source: ControlSource) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.graph.channel(id)?.set_volume(value, source)
    }

    pub fn set_pan(&mut self, id: TrackId, value: f32, source: ControlSource) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.graph.channel(id)?.set_pan(value, source)
    }

    pub fn set_eq(
        &mut self,
        id: TrackId,
        band: EqBand,
        value: f32,
        source: ControlSource,
    ) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.graph.channel(id)?.set_eq_band(band, value, source)
    }

    pub fn set_effect(
        &mut self,
        id: TrackId,
        effect: SendEffect,
        value: f32,
        source: ControlSource,
    ) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.graph.channel(id)?.set_effect_mix(effect, value, source)
    }

    pub fn set_master_gain(&mut self, value: f32, source: ControlSource) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        if let Some(gain) = MASTER_GAIN.resolve(value, source)? {
            self.graph.set_master_gain(gain);
        }
        Ok(())
    }

    pub fn master_gain(&self) -> f32 {
        self.graph.master_gain()
    }

    // ─────────────────────────────────────────────────────────────
    // Solo / mute
    // ─────────────────────────────────────────────────────────────

    /// Returns the new solo state
    pub fn toggle_solo(&mut self, id: TrackId) -> EngineResult<bool> {
        if self.is_disposed() {
            return Ok(false);
        }
        self.graph.solo_mute().toggle_solo(id)
    }

    /// Returns the new mute state
    pub fn toggle_mute(&mut self, id: TrackId) -> EngineResult<bool> {
        if self.is_disposed() {
            return Ok(false);
        }
        self.graph.solo_mute().toggle_mute(id)
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    pub fn play(&mut self) -> EngineResult<()> {
        self.transport.play(&mut self.graph)
    }

    pub fn pause(&mut self) {
        self.transport.pause(&mut self.graph);
    }

    pub fn stop(&mut self) {
        self.transport.stop(&mut self.graph);
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn transport_status(&self) -> TransportStatus {
        self.transport.status(&self.graph)
    }

    // ─────────────────────────────────────────────────────────────
    // Analysis and meters
    // ─────────────────────────────────────────────────────────────

    /// Returns whether the active view changed
    pub fn select_analysis_tab(&mut self, view: AnalysisView) -> bool {
        self.renderer.select(view)
    }

    pub fn analysis_view(&self) -> AnalysisView {
        self.renderer.view()
    }

    pub fn renderer(&self) -> &AnalysisRenderer {
        &self.renderer
    }

    /// One control tick: advance the transport, sample the meters, pull a
    /// fresh analysis snapshot and draw the active view
    ///
    /// Call every scheduler period (25 ms by default). Never blocks.
    pub fn tick(&mut self, surface: Option<&mut dyn RenderSurface>) {
        if self.is_disposed() {
            return;
        }
        self.transport.tick(&mut self.graph);
        self.meters.sample(&self.graph);
        let snapshot = self.graph.analyzer_mut().poll();
        self.renderer.render(snapshot, surface);
    }

    /// Level readings from the last tick
    pub fn meters(&self) -> &[LevelReading] {
        self.meters.readings()
    }

    /// Analyzer snapshot from the last tick
    pub fn analysis(&self) -> &AnalyzerSnapshot {
        self.graph.analyzer().snapshot()
    }

    // ─────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────

    pub fn export_state(&self) -> SessionState {
        SessionState::capture(&self.graph)
    }

    /// Apply a snapshot through the strict setters; returns rejected fields
    pub fn restore_state(&mut self, state: &SessionState) -> Vec<EngineError> {
        if self.is_disposed() {
            return Vec::new();
        }
        state.restore(&mut self.graph)
    }
}
