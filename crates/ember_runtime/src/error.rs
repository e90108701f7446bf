//! Error types for ember_runtime

use ember_core::SceneError;
use ember_platform::PlatformError;
use thiserror::Error;

/// Errors surfaced by the runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Invalid scene mutation
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Surface or platform failure
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// The root container was already disposed
    #[error("Root container disposed")]
    Disposed,

    /// A frame signal was dropped before the frame completed
    #[error("Frame signal dropped: {0}")]
    SignalDropped(String),
}

impl From<anyhow::Error> for RuntimeError {
    fn from(err: anyhow::Error) -> Self {
        RuntimeError::Config(format!("{:#}", err))
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
