//! Engine error types

use thiserror::Error;

use crate::audio::AudioError;
use crate::types::TrackId;

/// Errors surfaced by engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The audio output could not be acquired; fatal for this engine
    #[error("Audio initialization failed: {0}")]
    Initialization(#[from] AudioError),

    /// The running output failed to resume or suspend
    #[error("Audio output error: {0}")]
    Output(AudioError),

    /// A value outside its parameter domain was rejected
    #[error("Invalid {param}: {value} is outside [{min}, {max}]")]
    InvalidParameter {
        param: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Track {0} not found")]
    TrackNotFound(TrackId),

    #[error("Track {0} already exists")]
    DuplicateTrack(TrackId),

    #[error("Track limit of {0} reached")]
    TrackLimit(usize),

    /// The engine has been disposed and cannot create new objects
    #[error("Engine has been disposed")]
    Disposed,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
