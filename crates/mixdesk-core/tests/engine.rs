//! End-to-end behavior of the mixing engine on the headless output

use mixdesk_core::audio::{AudioError, HeadlessBackend, HeadlessRenderer};
use mixdesk_core::config::EngineConfig;
use mixdesk_core::dsp::EqBand;
use mixdesk_core::engine::{
    AnalysisView, CommandOutcome, ControlCommand, ControlSource, DisplayList, EngineError,
    Lifecycle, MixEngine, TrackConfig, TransportState,
};
use mixdesk_core::graph::{SendEffect, SineTone};
use mixdesk_core::{StereoSample, TrackId};

fn engine_with(backend: HeadlessBackend, config: EngineConfig) -> (MixEngine, HeadlessRenderer) {
    let renderer = backend.renderer();
    let engine = MixEngine::with_backend(config, Box::new(backend)).unwrap();
    (engine, renderer)
}

fn live_engine() -> (MixEngine, HeadlessRenderer) {
    let (mut engine, renderer) = engine_with(HeadlessBackend::new(), EngineConfig::headless());
    engine.initialize().unwrap();
    (engine, renderer)
}

fn with_tracks(engine: &mut MixEngine, n: usize) -> Vec<TrackId> {
    (0..n)
        .map(|_| engine.add_track(TrackConfig::default()).unwrap())
        .collect()
}

fn peak_of(samples: &[StereoSample]) -> f32 {
    samples.iter().map(|s| s.peak()).fold(0.0, f32::max)
}

/// One playing 1 kHz tone per track, past the first blocks
fn playing_tones(engine: &mut MixEngine, renderer: &HeadlessRenderer, n: usize) -> Vec<TrackId> {
    let ids = with_tracks(engine, n);
    for &id in &ids {
        engine.attach_source(id, Box::new(SineTone::new(1000.0, 0.5))).unwrap();
    }
    engine.play().unwrap();
    renderer.render(2400);
    ids
}

#[test]
fn test_mute_ramps_instead_of_stepping() {
    let (mut engine, renderer) = live_engine();
    let id = playing_tones(&mut engine, &renderer, 1)[0];
    let ramp = engine.graph().ramp_frames() as usize;
    assert_eq!(ramp, 384);

    engine.toggle_mute(id).unwrap();
    let out = renderer.render(ramp + 256);
    let samples = out.as_slice();

    assert!(peak_of(&samples[..50]) > 0.0);
    assert!(peak_of(&samples[ramp / 2 - 48..ramp / 2]) > 0.0);
    assert_eq!(peak_of(&samples[ramp..]), 0.0);
}

#[test]
fn test_solo_ramps_other_tracks_out() {
    let (mut engine, renderer) = live_engine();
    let ids = playing_tones(&mut engine, &renderer, 2);
    let ramp = engine.graph().ramp_frames() as usize;
    engine.toggle_mute(ids[1]).unwrap();
    renderer.render(ramp);

    // Soloing the muted track silences the other one over the ramp
    engine.toggle_solo(ids[1]).unwrap();
    let out = renderer.render(ramp + 256);
    let samples = out.as_slice();

    assert!(peak_of(&samples[..50]) > 0.0);
    assert_eq!(peak_of(&samples[ramp..]), 0.0);
}

#[test]
fn test_muted_track_has_zero_gain() {
    let (mut engine, renderer) = live_engine();
    let ids = with_tracks(&mut engine, 2);

    engine.toggle_solo(ids[0]).unwrap();
    assert!(engine.toggle_mute(ids[0]).unwrap());
    assert_eq!(engine.effective_gain(ids[0]), Some(0.0));
    assert_eq!(engine.track(ids[0]).unwrap().volume, 0.75);

    // The graph follows after the ramp
    renderer.render_blocks(2);
    engine.tick(None);
    let reading = engine.meters().iter().find(|r| r.id == ids[0]).unwrap();
    assert_eq!(reading.level, 0.0);
}

#[test]
fn test_solo_isolates_unmuted_tracks() {
    let (mut engine, _) = live_engine();
    let ids = with_tracks(&mut engine, 4);
    engine.set_volume(ids[2], 0.3, ControlSource::Api).unwrap();

    engine.toggle_solo(ids[1]).unwrap();
    engine.toggle_solo(ids[2]).unwrap();

    assert_eq!(engine.effective_gain(ids[0]), Some(0.0));
    assert_eq!(engine.effective_gain(ids[1]), Some(0.75));
    assert_eq!(engine.effective_gain(ids[2]), Some(0.3));
    assert_eq!(engine.effective_gain(ids[3]), Some(0.0));
}

#[test]
fn test_volume_survives_mute_round_trip() {
    let (mut engine, _) = live_engine();
    let id = with_tracks(&mut engine, 1)[0];

    engine.set_volume(id, 0.6, ControlSource::Ui).unwrap();
    engine.toggle_mute(id).unwrap();
    engine.toggle_mute(id).unwrap();
    assert_eq!(engine.effective_gain(id), Some(0.6));
}

#[test]
fn test_pan_clamped_or_rejected() {
    let (mut engine, _) = live_engine();
    let id = with_tracks(&mut engine, 1)[0];

    engine.set_pan(id, 1.5, ControlSource::Ui).unwrap();
    assert_eq!(engine.track(id).unwrap().pan, 1.0);

    engine.set_pan(id, 0.2, ControlSource::Ui).unwrap();
    let err = engine.set_pan(id, 1.5, ControlSource::Api).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter { param: "pan", .. }));
    assert_eq!(engine.track(id).unwrap().pan, 0.2);
}

#[test]
fn test_one_analysis_view_active() {
    let (mut engine, _) = live_engine();
    assert_eq!(engine.analysis_view(), AnalysisView::Spectrum);

    engine.select_analysis_tab(AnalysisView::Waveform);
    engine.select_analysis_tab(AnalysisView::Spectrum);
    assert_eq!(engine.analysis_view(), AnalysisView::Spectrum);
}

#[test]
fn test_add_track_defaults() {
    let (mut engine, _) = live_engine();
    let before = engine.tracks().len();
    let id = engine.add_track(TrackConfig::default()).unwrap();
    assert_eq!(engine.tracks().len(), before + 1);

    let track = engine.track(id).unwrap();
    assert_eq!(track.volume, 0.75);
    assert_eq!(track.pan, 0.0);
    for band in EqBand::ALL {
        assert_eq!(track.eq.get(band), 0.0);
    }
    assert_eq!(track.effects.get(SendEffect::Reverb), 0.0);
    assert!(!track.is_solo && !track.is_muted);
}

#[test]
fn test_solo_then_create() {
    let (mut engine, _) = live_engine();
    let one = engine
        .add_track(TrackConfig::default().with_id(TrackId(1)).with_volume(0.5))
        .unwrap();
    engine.toggle_solo(one).unwrap();
    let two = engine
        .add_track(TrackConfig::default().with_id(TrackId(2)).with_volume(0.8))
        .unwrap();

    assert_eq!(engine.effective_gain(two), Some(0.0));
    assert_eq!(engine.effective_gain(one), Some(0.5));
}

#[test]
fn test_transport_transitions() {
    let (mut engine, renderer) = live_engine();
    assert_eq!(engine.transport_state(), TransportState::Stopped);

    engine.play().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Playing);
    renderer.render(24000);

    engine.pause();
    let paused_at = engine.transport_status().elapsed_secs;
    assert_eq!(engine.transport_state(), TransportState::Paused);
    assert!((paused_at - 0.5).abs() < 1e-6);
    renderer.render(24000);
    assert_eq!(engine.transport_status().elapsed_secs, paused_at);

    engine.play().unwrap();
    renderer.render(4800);
    engine.stop();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert_eq!(engine.transport_status().elapsed_secs, 0.0);
}

#[test]
fn test_transport_auto_stops() {
    let mut config = EngineConfig::headless();
    config.transport.duration_secs = 0.25;
    let (mut engine, renderer) = engine_with(HeadlessBackend::new(), config);
    engine.initialize().unwrap();
    engine.play().unwrap();

    for _ in 0..20 {
        renderer.render(1200);
        engine.tick(None);
    }
    let status = engine.transport_status();
    assert_eq!(status.state, TransportState::Stopped);
    assert_eq!(status.elapsed_secs, 0.0);
}

#[test]
fn test_sources_play_only_while_playing() {
    let (mut engine, renderer) = live_engine();
    let id = with_tracks(&mut engine, 1)[0];
    engine.attach_source(id, Box::new(SineTone::new(440.0, 0.1))).unwrap();

    assert_eq!(renderer.render(2400).peak(), 0.0);
    engine.play().unwrap();
    assert!(renderer.render(2400).peak() > 0.01);
    engine.stop();
    renderer.render(480);
    assert_eq!(renderer.render(2400).peak(), 0.0);
}

#[test]
fn test_spectrum_tracks_master_output() {
    let (mut engine, renderer) = live_engine();
    let id = with_tracks(&mut engine, 1)[0];
    // Bin 32 of the 512-point analyzer at 48 kHz
    engine.attach_source(id, Box::new(SineTone::new(3000.0, 0.2))).unwrap();
    engine.play().unwrap();

    let mut surface = DisplayList::new(256.0, 64.0);
    for _ in 0..20 {
        renderer.render(1200);
        engine.tick(Some(&mut surface));
    }
    assert_eq!(engine.analysis().dominant_bin(), 32);
    assert!(engine.analysis().peak() > 0.02);
    assert!(surface.rects().count() > 0);
}

#[test]
fn test_initialization_failure_is_fatal() {
    let backend = HeadlessBackend::new().failing_with(AudioError::PermissionDenied);
    let (mut engine, _) = engine_with(backend, EngineConfig::headless());

    let err = engine.initialize().unwrap_err();
    assert_eq!(err, EngineError::Initialization(AudioError::PermissionDenied));
    assert!(matches!(engine.lifecycle(), Lifecycle::Failed(_)));
    // Never retried
    assert_eq!(engine.initialize().unwrap_err(), err);
    assert!(engine.play().is_err());
}

#[test]
fn test_suspended_output_is_resumed() {
    let (mut engine, renderer) =
        engine_with(HeadlessBackend::new().start_suspended(), EngineConfig::headless());
    engine.initialize().unwrap();
    assert!(renderer.is_live());
}

#[test]
fn test_resume_after_dispose_is_discarded() {
    let (mut engine, renderer) = engine_with(
        HeadlessBackend::new().start_suspended().deferred_resume(),
        EngineConfig::headless(),
    );
    engine.initialize().unwrap();
    assert!(!renderer.is_live());

    engine.dispose();
    assert!(!renderer.complete_resume());
    assert!(!renderer.is_live());
}

#[test]
fn test_operations_after_dispose_are_noops() {
    let (mut engine, _) = live_engine();
    let id = with_tracks(&mut engine, 1)[0];
    engine.dispose();
    engine.dispose();

    assert!(engine.is_disposed());
    assert_eq!(engine.set_volume(id, 0.1, ControlSource::Api), Ok(()));
    assert_eq!(engine.toggle_solo(id), Ok(false));
    assert_eq!(engine.play(), Ok(()));
    assert!(engine.remove_track(id).is_none());
    engine.tick(None);
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert!(engine.meters().is_empty());
}

#[test]
fn test_unknown_track_is_an_error_value() {
    let (mut engine, _) = live_engine();
    assert_eq!(
        engine.set_volume(TrackId(77), 0.5, ControlSource::Ui),
        Err(EngineError::TrackNotFound(TrackId(77)))
    );
    assert_eq!(engine.toggle_mute(TrackId(77)), Err(EngineError::TrackNotFound(TrackId(77))));
    assert!(engine.remove_track(TrackId(77)).is_none());
}

#[test]
fn test_export_and_restore() {
    let (mut engine, _) = live_engine();
    let ids = with_tracks(&mut engine, 2);
    engine.set_eq(ids[0], EqBand::High, 4.5, ControlSource::Ui).unwrap();
    engine.set_effect(ids[1], SendEffect::Delay, 30.0, ControlSource::Ui).unwrap();
    let saved = engine.export_state();

    engine.set_eq(ids[0], EqBand::High, -12.0, ControlSource::Ui).unwrap();
    engine.set_effect(ids[1], SendEffect::Delay, 0.0, ControlSource::Ui).unwrap();

    assert!(engine.restore_state(&saved).is_empty());
    assert_eq!(engine.track(ids[0]).unwrap().eq.high, 4.5);
    assert_eq!(engine.track(ids[1]).unwrap().effects.delay, 30.0);
}

#[test]
fn test_dispatch_console_lines() {
    let (mut engine, _) = live_engine();
    let mut run = |line: &str| {
        let cmd = ControlCommand::parse(line).unwrap();
        engine.dispatch(cmd, ControlSource::Ui)
    };

    assert_eq!(run("add Lead vocals"), Ok(CommandOutcome::TrackAdded(TrackId(1))));
    assert_eq!(run("vol 1 0.4"), Ok(CommandOutcome::Applied));
    assert_eq!(run("solo 1"), Ok(CommandOutcome::Solo { id: TrackId(1), on: true }));
    assert_eq!(
        run("tab waveform"),
        Ok(CommandOutcome::ViewSelected { view: AnalysisView::Waveform, changed: true })
    );
    assert_eq!(run("rm 1"), Ok(CommandOutcome::TrackRemoved(Some(TrackId(1)))));
    assert_eq!(run("rm 1"), Ok(CommandOutcome::TrackRemoved(None)));
    assert_eq!(run("pan 1 0"), Err(EngineError::TrackNotFound(TrackId(1))));
}
