//! The audio-thread signal graph
//!
//! Owned exclusively by the backend callback. Each block:
//!
//! 1. Drain pending `GraphCommand`s
//! 2. Render every strip in parallel (rayon)
//! 3. Sum strips and send returns sequentially into the master input
//! 4. Run the master bus and advance the audio clock
//!
//! A block that crosses the armed stop frame renders as two segments, so
//! sources go silent on that frame rather than at the next block.

use basedrop::Owned;
use rayon::prelude::*;

use super::command::GraphCommand;
use super::master::{MasterBus, SendReturns};
use super::strip::StripDsp;
use crate::audio::AudioClock;
use crate::types::{StereoBuffer, TrackId, MAX_BLOCK_SIZE, MAX_TRACKS};

pub struct MixGraph {
    sample_rate: u32,
    commands: rtrb::Consumer<GraphCommand>,
    strips: Vec<Owned<StripDsp>>,
    returns: SendReturns,
    master: MasterBus,
    /// Whether sources render (transport playing)
    running: bool,
    /// Absolute frame at which `running` drops to false
    stop_at: Option<u64>,
    /// Master input for the segment being rendered
    mix: StereoBuffer,
    clock: AudioClock,
}

impl MixGraph {
    pub fn new(
        sample_rate: u32,
        commands: rtrb::Consumer<GraphCommand>,
        master: MasterBus,
        clock: AudioClock,
    ) -> Self {
        Self {
            sample_rate,
            commands,
            strips: Vec::with_capacity(MAX_TRACKS),
            returns: SendReturns::new(sample_rate),
            master,
            running: false,
            stop_at: None,
            mix: StereoBuffer::preallocated(MAX_BLOCK_SIZE, 0),
            clock,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn strip_mut(&mut self, id: TrackId) -> Option<&mut StripDsp> {
        self.strips.iter_mut().find(|s| s.id() == id).map(|s| &mut **s)
    }

    /// Apply all queued commands (lock-free, called at block start)
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            self.apply(cmd);
        }
    }

    fn apply(&mut self, cmd: GraphCommand) {
        match cmd {
            GraphCommand::AddStrip { strip } => {
                // Replace a stale strip with the same id rather than doubling it
                let id = strip.id();
                self.strips.retain(|s| s.id() != id);
                if self.strips.len() < self.strips.capacity() {
                    self.strips.push(strip);
                }
            }
            GraphCommand::RemoveStrip { id } => self.strips.retain(|s| s.id() != id),
            GraphCommand::RemoveAll => self.strips.clear(),
            GraphCommand::AttachSource { id, source } => {
                if let Some(strip) = self.strip_mut(id) {
                    // Previous source is dropped through the collector
                    drop(strip.attach_source(source));
                }
            }
            GraphCommand::SetGain { id, gain, ramp_frames } => {
                if let Some(strip) = self.strip_mut(id) {
                    strip.set_gain(gain, ramp_frames);
                }
            }
            GraphCommand::SetPan { id, pan } => {
                if let Some(strip) = self.strip_mut(id) {
                    strip.set_pan(pan);
                }
            }
            GraphCommand::SetEq { id, band, gain_db } => {
                if let Some(strip) = self.strip_mut(id) {
                    strip.set_eq(band, gain_db);
                }
            }
            GraphCommand::SetSend { id, effect, level } => {
                if let Some(strip) = self.strip_mut(id) {
                    strip.set_send(effect, level);
                }
            }
            GraphCommand::SetMasterGain { gain, ramp_frames } => {
                self.master.set_gain(gain, ramp_frames);
            }
            GraphCommand::SetRunning(running) => self.running = running,
            GraphCommand::ScheduleStop { at_frame } => self.stop_at = at_frame,
            GraphCommand::ResetSources => {
                for strip in &mut self.strips {
                    strip.reset_source();
                }
                self.returns.reset();
            }
        }
    }

    /// Render one block into `out` (its length is the block size)
    pub fn process(&mut self, out: &mut StereoBuffer) {
        let n_frames = out.len();
        self.process_commands();

        let mut offset = 0;
        while offset < n_frames {
            let remaining = n_frames - offset;
            let len = match self.frames_until_stop() {
                Some(0) => {
                    self.running = false;
                    self.stop_at = None;
                    remaining
                }
                Some(until) => until.min(remaining as u64) as usize,
                None => remaining,
            };
            self.render_segment(len);
            out.as_mut_slice()[offset..offset + len].copy_from_slice(self.mix.as_slice());
            offset += len;
        }
    }

    fn frames_until_stop(&self) -> Option<u64> {
        self.stop_at
            .map(|at| at.saturating_sub(self.clock.frames()))
    }

    /// Render `n_frames` into `self.mix` and advance the clock
    fn render_segment(&mut self, n_frames: usize) {
        // Phase 1: parallel strip processing
        let running = self.running;
        self.strips
            .par_iter_mut()
            .for_each(|strip| strip.process(n_frames, running));

        // Phase 2: sequential summing into the master input
        let mix = &mut self.mix;
        mix.set_len_from_capacity(n_frames);
        mix.fill_silence();
        self.returns.begin(n_frames);
        for strip in &self.strips {
            mix.add_buffer(strip.output());
            self.returns.accumulate(strip);
        }
        self.returns.render_into(mix);

        self.master.process(mix);
        self.clock.advance(n_frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::CompressorSettings;
    use crate::graph::command::command_channel;
    use crate::graph::gc::rt_owned;
    use crate::graph::source::{SignalSource, SineTone};
    use crate::graph::strip::{ChannelAtomics, StripParams};
    use std::sync::Arc;

    const SR: u32 = 48000;

    fn graph() -> (crate::graph::GraphSender, MixGraph, AudioClock) {
        let (tx, rx) = command_channel();
        let clock = AudioClock::new(SR);
        let master = MasterBus::new(CompressorSettings::default(), 1.0, SR, None);
        (tx, MixGraph::new(SR, rx, master, clock.clone()), clock)
    }

    fn add_tone(tx: &mut crate::graph::GraphSender, id: u32, gain: f32) -> Arc<ChannelAtomics> {
        let atomics = Arc::new(ChannelAtomics::new(gain));
        let strip = StripDsp::new(
            TrackId(id),
            SR,
            StripParams { gain, ..Default::default() },
            atomics.clone(),
        );
        tx.send(GraphCommand::AddStrip { strip: rt_owned(strip) }).unwrap();
        let tone: Box<dyn SignalSource> = Box::new(SineTone::new(1000.0, 0.01));
        tx.send(GraphCommand::AttachSource { id: TrackId(id), source: rt_owned(tone) })
            .unwrap();
        atomics
    }

    #[test]
    fn test_clock_advances_per_block() {
        let (_tx, mut g, clock) = graph();
        let mut out = StereoBuffer::silence(256);
        g.process(&mut out);
        g.process(&mut out);
        assert_eq!(clock.frames(), 512);
    }

    #[test]
    fn test_sources_gated_until_running() {
        let (mut tx, mut g, _) = graph();
        add_tone(&mut tx, 1, 1.0);
        let mut out = StereoBuffer::silence(480);

        g.process(&mut out);
        assert_eq!(g.strip_count(), 1);
        assert_eq!(out.peak(), 0.0);

        tx.send(GraphCommand::SetRunning(true)).unwrap();
        g.process(&mut out);
        assert!((out.peak() - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_strips_sum_and_remove() {
        let (mut tx, mut g, _) = graph();
        add_tone(&mut tx, 1, 1.0);
        add_tone(&mut tx, 2, 1.0);
        tx.send(GraphCommand::SetRunning(true)).unwrap();

        let mut out = StereoBuffer::silence(480);
        g.process(&mut out);
        assert!((out.peak() - 0.02).abs() < 1e-4);

        tx.send(GraphCommand::RemoveStrip { id: TrackId(2) }).unwrap();
        g.process(&mut out);
        assert_eq!(g.strip_count(), 1);
        assert!((out.peak() - 0.01).abs() < 1e-4);

        tx.send(GraphCommand::RemoveAll).unwrap();
        g.process(&mut out);
        assert_eq!(g.strip_count(), 0);
    }

    #[test]
    fn test_gain_command_reaches_atomics() {
        let (mut tx, mut g, _) = graph();
        let atomics = add_tone(&mut tx, 3, 0.75);
        tx.send(GraphCommand::SetGain { id: TrackId(3), gain: 0.0, ramp_frames: 100 })
            .unwrap();
        let mut out = StereoBuffer::silence(256);
        g.process(&mut out);
        assert_eq!(atomics.gain(), 0.0);
    }

    #[test]
    fn test_scheduled_stop_gates_sources() {
        let (mut tx, mut g, _) = graph();
        add_tone(&mut tx, 1, 1.0);
        tx.send(GraphCommand::SetRunning(true)).unwrap();
        tx.send(GraphCommand::ScheduleStop { at_frame: Some(512) }).unwrap();

        let mut out = StereoBuffer::silence(256);
        g.process(&mut out);
        g.process(&mut out);
        assert!(g.is_running());
        assert!(out.peak() > 0.0);

        g.process(&mut out);
        assert!(!g.is_running());
    }

    #[test]
    fn test_stop_lands_inside_block() {
        let (mut tx, mut g, clock) = graph();
        add_tone(&mut tx, 1, 1.0);
        tx.send(GraphCommand::SetRunning(true)).unwrap();
        tx.send(GraphCommand::ScheduleStop { at_frame: Some(100) }).unwrap();

        let mut out = StereoBuffer::silence(256);
        g.process(&mut out);
        assert!(!g.is_running());
        assert_eq!(clock.frames(), 256);

        let before = StereoBuffer::from_vec(out.as_slice()[..100].to_vec());
        let after = StereoBuffer::from_vec(out.as_slice()[100..].to_vec());
        assert!(before.peak() > 0.0);
        assert_eq!(after.peak(), 0.0);
    }

    #[test]
    fn test_commands_for_unknown_strip_are_ignored() {
        let (mut tx, mut g, _) = graph();
        tx.send(GraphCommand::SetPan { id: TrackId(9), pan: 1.0 }).unwrap();
        let mut out = StereoBuffer::silence(64);
        g.process(&mut out);
        assert_eq!(g.strip_count(), 0);
    }
}
