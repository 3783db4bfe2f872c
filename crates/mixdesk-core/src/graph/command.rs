//! Lock-free command queue from the control side to the audio graph
//!
//! Every graph mutation is a `GraphCommand` pushed onto an `rtrb` ring
//! buffer. The audio callback drains the queue at the start of each block,
//! so commands for one parameter apply in the order they were issued and
//! never land mid-block.
//!
//! Heap objects (strips, sources) are wrapped in `basedrop::Owned` before
//! they are queued; whatever the graph drops afterwards is reclaimed by the
//! collector thread.

use basedrop::Owned;

use super::source::SignalSource;
use super::strip::{SendEffect, StripDsp};
use crate::dsp::EqBand;
use crate::types::TrackId;

/// Command queue capacity
///
/// A solo toggle with a full session emits one gain command per track, so
/// the queue holds many times `MAX_TRACKS`.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Commands sent from the control thread to the audio thread
pub enum GraphCommand {
    // ─────────────────────────────────────────────────────────────
    // Topology
    // ─────────────────────────────────────────────────────────────
    /// Wire a new strip into the master input
    AddStrip { strip: Owned<StripDsp> },
    /// Disconnect one strip
    RemoveStrip { id: TrackId },
    /// Disconnect every strip
    RemoveAll,
    /// Replace a strip's signal source
    AttachSource {
        id: TrackId,
        source: Owned<Box<dyn SignalSource>>,
    },

    // ─────────────────────────────────────────────────────────────
    // Strip parameters
    // ─────────────────────────────────────────────────────────────
    /// Set the effective gain, optionally ramped over `ramp_frames`
    SetGain { id: TrackId, gain: f32, ramp_frames: u32 },
    SetPan { id: TrackId, pan: f32 },
    SetEq { id: TrackId, band: EqBand, gain_db: f32 },
    /// Send level 0..1
    SetSend { id: TrackId, effect: SendEffect, level: f32 },

    // ─────────────────────────────────────────────────────────────
    // Master / transport
    // ─────────────────────────────────────────────────────────────
    SetMasterGain { gain: f32, ramp_frames: u32 },
    /// Gate all sources (transport playing or not)
    SetRunning(bool),
    /// Stop the sources once the clock reaches `at_frame` (`None` disarms)
    ScheduleStop { at_frame: Option<u64> },
    /// Rewind every source and clear the send tails
    ResetSources,
}

impl std::fmt::Debug for GraphCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphCommand::AddStrip { strip } => write!(f, "AddStrip({})", strip.id()),
            GraphCommand::RemoveStrip { id } => write!(f, "RemoveStrip({})", id),
            GraphCommand::RemoveAll => write!(f, "RemoveAll"),
            GraphCommand::AttachSource { id, source } => {
                write!(f, "AttachSource({}, {})", id, source.name())
            }
            GraphCommand::SetGain { id, gain, ramp_frames } => {
                write!(f, "SetGain({}, {:.3}, {} frames)", id, gain, ramp_frames)
            }
            GraphCommand::SetPan { id, pan } => write!(f, "SetPan({}, {:.3})", id, pan),
            GraphCommand::SetEq { id, band, gain_db } => {
                write!(f, "SetEq({}, {}, {:.1} dB)", id, band.name(), gain_db)
            }
            GraphCommand::SetSend { id, effect, level } => {
                write!(f, "SetSend({}, {}, {:.2})", id, effect.name(), level)
            }
            GraphCommand::SetMasterGain { gain, ramp_frames } => {
                write!(f, "SetMasterGain({:.3}, {} frames)", gain, ramp_frames)
            }
            GraphCommand::SetRunning(running) => write!(f, "SetRunning({})", running),
            GraphCommand::ScheduleStop { at_frame } => write!(f, "ScheduleStop({:?})", at_frame),
            GraphCommand::ResetSources => write!(f, "ResetSources"),
        }
    }
}

/// Create the command queue (producer for control, consumer for audio)
pub fn command_channel() -> (GraphSender, rtrb::Consumer<GraphCommand>) {
    let (producer, consumer) = rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY);
    (GraphSender { producer }, consumer)
}

/// Control-side end of the command queue
///
/// All operations are non-blocking.
pub struct GraphSender {
    producer: rtrb::Producer<GraphCommand>,
}

impl GraphSender {
    /// Queue a command; returns it back if the queue is full
    pub fn send(&mut self, cmd: GraphCommand) -> Result<(), GraphCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Free slots left in the queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    /// Whether the audio side has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut tx, mut rx) = command_channel();
        tx.send(GraphCommand::SetPan { id: TrackId(1), pan: -1.0 }).unwrap();
        tx.send(GraphCommand::SetPan { id: TrackId(1), pan: 0.5 }).unwrap();

        let pans: Vec<f32> = std::iter::from_fn(|| rx.pop().ok())
            .map(|cmd| match cmd {
                GraphCommand::SetPan { pan, .. } => pan,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(pans, vec![-1.0, 0.5]);
    }

    #[test]
    fn test_full_queue_returns_command() {
        let (mut tx, _rx) = command_channel();
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            tx.send(GraphCommand::RemoveAll).unwrap();
        }
        assert_eq!(tx.slots(), 0);
        assert!(matches!(
            tx.send(GraphCommand::SetRunning(true)),
            Err(GraphCommand::SetRunning(true))
        ));
    }
}
