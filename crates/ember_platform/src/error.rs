//! Platform error types

use thiserror::Error;

/// Platform-related errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Operation on a surface that was already disposed
    #[error("Surface disposed: {0}")]
    SurfaceDisposed(String),

    /// Backing surface could not be presented
    #[error("Present failed: {0}")]
    Present(String),

    /// Releasing a surface or render target failed
    #[error("Surface teardown failed: {0}")]
    Teardown(String),

    /// Platform not available
    #[error("Platform not available: {0}")]
    Unavailable(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
