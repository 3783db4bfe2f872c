//! Mixdesk Core - Real-time multi-track mixing engine

pub mod audio;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod graph;
pub mod types;

pub use engine::{ControlCommand, ControlSource, EngineError, EngineResult, MixEngine};
pub use types::*;
