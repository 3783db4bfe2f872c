//! Audio backend error types

use thiserror::Error;

/// Errors that can occur while acquiring or driving the audio output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Failed to pause stream
    #[error("Failed to suspend audio stream: {0}")]
    StreamPauseError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The audio subsystem itself is missing
    #[error("Audio subsystem unavailable: {0}")]
    BackendUnavailable(String),

    /// The platform refused access to the output
    #[error("Permission to use the audio output was denied")]
    PermissionDenied,

    /// Operation requires an opened backend
    #[error("Audio backend has not been opened")]
    NotOpen,
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
