//! Audio-thread signal graph
//!
//! Everything here runs inside the backend callback except the
//! constructors and `GraphSender`. The control side talks to the graph
//! only through the command queue and reads back through atomics and the
//! analyzer tap.

mod command;
pub(crate) mod gc;
mod master;
mod mix_graph;
mod source;
mod strip;

pub use command::{command_channel, GraphCommand, GraphSender, COMMAND_QUEUE_CAPACITY};
pub use gc::rt_owned;
pub use master::{analyzer_tap, MasterAtomics, MasterBus, SendReturns, ANALYZER_TAP_CAPACITY};
pub use mix_graph::MixGraph;
pub use source::{SignalSource, Silence, SineTone};
pub use strip::{ChannelAtomics, SendEffect, StripDsp, StripParams};
