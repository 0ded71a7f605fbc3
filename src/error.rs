//! Error types for voxlate

use thiserror::Error;

/// Result type alias for voxlate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, translating, or speaking
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// The platform offers no engine for this capability
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Speech recognition failed (device, permission, network)
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis or playback failed
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Remote translation failed
    ///
    /// Only raised inside translator adapters; the `Translator` contract
    /// degrades it into the original text at zero confidence.
    #[error("translation error: {0}")]
    Translation(String),

    /// Credential could not be resolved
    #[error("credential error: {0}")]
    Credential(String),

    /// The in-flight stage was cancelled
    #[error("cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
