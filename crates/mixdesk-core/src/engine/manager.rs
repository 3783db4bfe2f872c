//! Audio graph manager
//!
//! Owns the platform output, the command queue into the audio thread and
//! the control-side record of every track. All graph mutation funnels
//! through here; the channel strip, solo/mute and transport controllers
//! borrow the manager to do their work.
//!
//! Lifecycle: construct → `initialize` → `dispose`. Tracks may be created
//! and edited before `initialize`; their strips are built when the output
//! comes up.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audio::{AudioBackend, AudioClock, AudioError, AudioResult, StreamInfo};
use crate::config::EngineConfig;
use crate::dsp::ramp_frames;
use crate::graph::{
    analyzer_tap, command_channel, rt_owned, ChannelAtomics, GraphCommand, GraphSender,
    MasterAtomics, MasterBus, MixGraph, SignalSource, StripDsp,
};
use crate::types::{TrackId, MAX_TRACKS};

use super::analyzer::Analyzer;
use super::channel::ChannelStrip;
use super::error::{EngineError, EngineResult};
use super::solo::SoloMuteCoordinator;
use super::track::{Track, TrackConfig};

/// Where the manager is in its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Built, output not yet acquired
    Constructed,
    /// Output acquired and the graph is running
    Live,
    /// `initialize` failed; the engine stays unusable
    Failed(AudioError),
    /// Torn down; every further call is a no-op
    Disposed,
}

struct Channel {
    track: Track,
    atomics: Arc<ChannelAtomics>,
    /// Source waiting for the graph to come up
    pending_source: Option<Box<dyn SignalSource>>,
}

pub struct AudioGraphManager {
    config: EngineConfig,
    backend: Box<dyn AudioBackend>,
    lifecycle: Lifecycle,
    sender: Option<GraphSender>,
    channels: BTreeMap<TrackId, Channel>,
    next_id: u32,
    clock: AudioClock,
    stream: Option<StreamInfo>,
    master_atomics: Option<Arc<MasterAtomics>>,
    master_gain: f32,
    analyzer: Analyzer,
}

impl AudioGraphManager {
    pub fn new(config: EngineConfig, backend: Box<dyn AudioBackend>) -> Self {
        let config = config.validated();
        Self {
            clock: AudioClock::new(config.audio.target_sample_rate()),
            analyzer: Analyzer::new(config.analyzer.clone()),
            master_gain: config.master.gain.clamp(0.0, 1.0),
            backend,
            lifecycle: Lifecycle::Constructed,
            sender: None,
            channels: BTreeMap::new(),
            next_id: 1,
            stream: None,
            master_atomics: None,
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Acquire the output and start the graph
    ///
    /// Idempotent. A failure is fatal for this manager: it is returned
    /// again on every later call and never retried.
    pub fn initialize(&mut self) -> EngineResult<()> {
        match &self.lifecycle {
            Lifecycle::Live | Lifecycle::Disposed => return Ok(()),
            Lifecycle::Failed(error) => return Err(EngineError::Initialization(error.clone())),
            Lifecycle::Constructed => {}
        }

        match self.start_output() {
            Ok(info) => {
                log::info!(
                    "Audio output live on '{}' via {} ({} Hz, {} frames, {:.1} ms)",
                    info.device_name,
                    self.backend.name(),
                    info.sample_rate,
                    info.buffer_size,
                    info.latency_ms()
                );
                self.stream = Some(info);
                self.lifecycle = Lifecycle::Live;
                Ok(())
            }
            Err(error) => {
                log::error!("Audio initialization failed: {}", error);
                self.backend.close();
                self.sender = None;
                self.master_atomics = None;
                self.analyzer.detach();
                self.lifecycle = Lifecycle::Failed(error.clone());
                Err(EngineError::Initialization(error))
            }
        }
    }

    fn start_output(&mut self) -> AudioResult<StreamInfo> {
        let info = self.backend.open(&self.config.audio)?;
        let sample_rate = info.sample_rate;
        self.clock.set_sample_rate(sample_rate);

        let (mut sender, consumer) = command_channel();
        let (tap_producer, tap_consumer) = analyzer_tap();
        let master = MasterBus::new(
            self.config.master.compressor.sanitized(),
            self.master_gain,
            sample_rate,
            Some(tap_producer),
        );
        let master_atomics = master.atomics();

        // Strips for tracks created before the output came up
        let any_solo = self.any_solo();
        for channel in self.channels.values_mut() {
            let strip = StripDsp::new(
                channel.track.id,
                sample_rate,
                channel.track.strip_params(any_solo),
                Arc::clone(&channel.atomics),
            );
            if sender.send(GraphCommand::AddStrip { strip: rt_owned(strip) }).is_err() {
                log::warn!("Command queue full while wiring track {}", channel.track.id);
            }
            if let Some(source) = channel.pending_source.take() {
                let _ = sender.send(GraphCommand::AttachSource {
                    id: channel.track.id,
                    source: rt_owned(source),
                });
            }
        }

        let graph = MixGraph::new(sample_rate, consumer, master, self.clock.clone());
        self.backend.start(graph)?;

        if self.backend.is_suspended() {
            log::info!("Output started suspended, resuming");
            self.backend.resume()?;
        }

        self.sender = Some(sender);
        self.master_atomics = Some(master_atomics);
        self.analyzer.attach(tap_consumer);
        Ok(info)
    }

    /// Disconnect every track and the master bus and release the output
    ///
    /// Repeated calls are no-ops. A resume completing afterward is discarded
    /// by the backend.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.send(GraphCommand::RemoveAll);
        self.backend.close();
        self.sender = None;
        self.master_atomics = None;
        self.stream = None;
        self.analyzer.detach();
        self.channels.clear();
        self.lifecycle = Lifecycle::Disposed;
        log::info!("Audio graph disposed");
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Live
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    /// Resume the output if the device suspended it
    pub fn resume_output(&mut self) -> EngineResult<()> {
        if !self.is_live() || !self.backend.is_suspended() {
            return Ok(());
        }
        log::info!("Resuming suspended output");
        self.backend.resume().map_err(EngineError::Output)
    }

    pub fn is_output_suspended(&self) -> bool {
        self.backend.is_suspended()
    }

    // ─────────────────────────────────────────────────────────────
    // Tracks
    // ─────────────────────────────────────────────────────────────

    /// Create a track and wire its strip into the master input
    ///
    /// Ids are assigned sequentially unless the config supplies one. The
    /// new strip starts at its solo-aware effective gain.
    pub fn create_track(&mut self, config: &TrackConfig) -> EngineResult<TrackId> {
        if self.is_disposed() {
            return Err(EngineError::Disposed);
        }
        if self.channels.len() >= MAX_TRACKS {
            return Err(EngineError::TrackLimit(MAX_TRACKS));
        }

        let id = match config.id {
            Some(id) if self.channels.contains_key(&id) => {
                return Err(EngineError::DuplicateTrack(id));
            }
            Some(id) => id,
            None => self.next_free_id(),
        };
        // A rejected config leaves the id free for the next track
        let track = Track::from_config(id, config)?;
        self.next_id = self.next_id.max(id.raw().saturating_add(1));

        let gain = track.effective_gain(self.any_solo());
        let atomics = Arc::new(ChannelAtomics::new(gain));

        if self.sender.is_some() {
            let strip = StripDsp::new(
                id,
                self.clock.sample_rate(),
                track.strip_params(self.any_solo()),
                Arc::clone(&atomics),
            );
            self.send(GraphCommand::AddStrip { strip: rt_owned(strip) });
        }

        log::debug!("Created track {} '{}' (gain {:.2})", id, track.name, gain);
        self.channels.insert(
            id,
            Channel {
                track,
                atomics,
                pending_source: None,
            },
        );
        Ok(id)
    }

    fn next_free_id(&self) -> TrackId {
        let mut id = TrackId(self.next_id);
        while self.channels.contains_key(&id) {
            id = id.next();
        }
        id
    }

    /// Disconnect and release one track; absent ids are a no-op
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let channel = self.channels.remove(&id)?;
        self.send(GraphCommand::RemoveStrip { id });
        log::debug!("Removed track {}", id);

        // Removing the last soloed track brings everyone else back
        if channel.track.is_solo {
            self.apply_all_gains(self.ramp_frames());
        }
        Some(channel.track)
    }

    /// Set a track's signal source (sine, sampler, sequencer voice, ...)
    pub fn attach_source(&mut self, id: TrackId, source: Box<dyn SignalSource>) -> EngineResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        if !self.channels.contains_key(&id) {
            return Err(EngineError::TrackNotFound(id));
        }

        log::debug!("Attaching source '{}' to track {}", source.name(), id);
        if self.sender.is_some() {
            self.send(GraphCommand::AttachSource { id, source: rt_owned(source) });
        } else if let Some(channel) = self.channels.get_mut(&id) {
            channel.pending_source = Some(source);
        }
        Ok(())
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.channels.get(&id).map(|c| &c.track)
    }

    pub(crate) fn track_mut(&mut self, id: TrackId) -> EngineResult<&mut Track> {
        self.channels
            .get_mut(&id)
            .map(|c| &mut c.track)
            .ok_or(EngineError::TrackNotFound(id))
    }

    /// Tracks in id order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.channels.values().map(|c| &c.track)
    }

    pub fn track_count(&self) -> usize {
        self.channels.len()
    }

    /// Tracks paired with their audio-thread readback
    pub(crate) fn channel_readback(&self) -> impl Iterator<Item = (&Track, &ChannelAtomics)> {
        self.channels.values().map(|c| (&c.track, c.atomics.as_ref()))
    }

    // ─────────────────────────────────────────────────────────────
    // Controllers
    // ─────────────────────────────────────────────────────────────

    /// Parameter surface for one track
    pub fn channel(&mut self, id: TrackId) -> EngineResult<ChannelStrip<'_>> {
        if !self.channels.contains_key(&id) {
            return Err(EngineError::TrackNotFound(id));
        }
        Ok(ChannelStrip::new(self, id))
    }

    pub fn solo_mute(&mut self) -> SoloMuteCoordinator<'_> {
        SoloMuteCoordinator::new(self)
    }

    // ─────────────────────────────────────────────────────────────
    // Gain application
    // ─────────────────────────────────────────────────────────────

    pub fn any_solo(&self) -> bool {
        self.channels.values().any(|c| c.track.is_solo)
    }

    /// Gain the graph applies to a track right now
    pub fn effective_gain(&self, id: TrackId) -> Option<f32> {
        let any_solo = self.any_solo();
        self.track(id).map(|t| t.effective_gain(any_solo))
    }

    /// Push one track's effective gain to the graph
    pub(crate) fn apply_gain(&mut self, id: TrackId, ramp_frames: u32) {
        if let Some(gain) = self.effective_gain(id) {
            self.send(GraphCommand::SetGain { id, gain, ramp_frames });
        }
    }

    /// Push every track's effective gain to the graph
    pub(crate) fn apply_all_gains(&mut self, ramp_frames: u32) {
        let any_solo = self.any_solo();
        let gains: Vec<(TrackId, f32)> = self
            .channels
            .values()
            .map(|c| (c.track.id, c.track.effective_gain(any_solo)))
            .collect();
        for (id, gain) in gains {
            self.send(GraphCommand::SetGain { id, gain, ramp_frames });
        }
    }

    /// Solo/mute ramp length at the current sample rate
    pub fn ramp_frames(&self) -> u32 {
        ramp_frames(self.config.ramp_ms, self.clock.sample_rate())
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub(crate) fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
        let ramp_frames = self.ramp_frames();
        self.send(GraphCommand::SetMasterGain { gain, ramp_frames });
    }

    /// Queue a command for the audio thread
    ///
    /// Dropped with a warning when the queue is full; ignored before the
    /// graph exists.
    pub(crate) fn send(&mut self, cmd: GraphCommand) {
        if let Some(sender) = self.sender.as_mut() {
            if let Err(cmd) = sender.send(cmd) {
                log::warn!("Graph command queue full, dropping {:?}", cmd);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Readback
    // ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.stream.as_ref()
    }

    pub fn master_atomics(&self) -> Option<&MasterAtomics> {
        self.master_atomics.as_deref()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }
}

impl Drop for AudioGraphManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{HeadlessBackend, HeadlessRenderer};
    use crate::graph::SineTone;

    fn manager() -> (AudioGraphManager, HeadlessRenderer) {
        let backend = HeadlessBackend::new();
        let renderer = backend.renderer();
        (AudioGraphManager::new(EngineConfig::headless(), Box::new(backend)), renderer)
    }

    #[test]
    fn test_sequential_ids() {
        let (mut m, _) = manager();
        let a = m.create_track(&TrackConfig::default()).unwrap();
        let b = m.create_track(&TrackConfig::default().with_id(TrackId(10))).unwrap();
        let c = m.create_track(&TrackConfig::default()).unwrap();
        assert_eq!((a, b, c), (TrackId(1), TrackId(10), TrackId(11)));
        assert_eq!(
            m.create_track(&TrackConfig::default().with_id(TrackId(1))),
            Err(EngineError::DuplicateTrack(TrackId(1)))
        );
    }

    #[test]
    fn test_rejected_config_does_not_consume_id() {
        let (mut m, _) = manager();
        assert!(matches!(
            m.create_track(&TrackConfig::default().with_volume(2.0)),
            Err(EngineError::InvalidParameter { param: "volume", .. })
        ));
        assert_eq!(m.track_count(), 0);
        assert_eq!(m.create_track(&TrackConfig::default()).unwrap(), TrackId(1));
        assert_eq!(m.create_track(&TrackConfig::default()).unwrap(), TrackId(2));
    }

    #[test]
    fn test_tracks_created_before_initialize_are_wired() {
        let (mut m, renderer) = manager();
        let id = m.create_track(&TrackConfig::default().with_volume(1.0)).unwrap();
        m.attach_source(id, Box::new(SineTone::new(440.0, 0.1))).unwrap();
        m.initialize().unwrap();
        m.send(GraphCommand::SetRunning(true));

        let out = renderer.render(4800);
        assert!(out.peak() > 0.02);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut m, renderer) = manager();
        m.initialize().unwrap();
        m.initialize().unwrap();
        assert!(m.is_live());
        assert!(renderer.is_live());
    }

    #[test]
    fn test_failed_initialize_is_not_retried() {
        let backend = HeadlessBackend::new().failing_with(AudioError::PermissionDenied);
        let mut m = AudioGraphManager::new(EngineConfig::headless(), Box::new(backend));
        let err = m.initialize().unwrap_err();
        assert_eq!(err, EngineError::Initialization(AudioError::PermissionDenied));
        assert_eq!(m.lifecycle(), &Lifecycle::Failed(AudioError::PermissionDenied));
        assert_eq!(m.initialize().unwrap_err(), err);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut m, _) = manager();
        m.initialize().unwrap();
        let id = m.create_track(&TrackConfig::default()).unwrap();
        assert!(m.remove_track(id).is_some());
        assert!(m.remove_track(id).is_none());
        assert_eq!(m.track_count(), 0);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (mut m, renderer) = manager();
        m.initialize().unwrap();
        m.create_track(&TrackConfig::default()).unwrap();
        m.dispose();
        m.dispose();

        assert!(m.is_disposed());
        assert_eq!(m.track_count(), 0);
        assert!(renderer.is_torn_down());
        assert!(renderer.render(256).is_empty());
        assert_eq!(m.create_track(&TrackConfig::default()), Err(EngineError::Disposed));
        assert_eq!(m.initialize(), Ok(()));
    }

    #[test]
    fn test_track_limit() {
        let (mut m, _) = manager();
        for _ in 0..MAX_TRACKS {
            m.create_track(&TrackConfig::default()).unwrap();
        }
        assert_eq!(
            m.create_track(&TrackConfig::default()),
            Err(EngineError::TrackLimit(MAX_TRACKS))
        );
    }
}
