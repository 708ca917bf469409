//! Error types for the wake word gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the wake word gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input bytes do not form whole 16-bit samples
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Scoring engine failed on a frame
    #[error("scoring error: {0}")]
    Scoring(String),

    /// Scoring engine did not answer within the per-frame budget
    #[error("scoring timed out after {0} ms")]
    ScoringTimeout(u64),

    /// Request rejected before reaching an engine
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Synthesis engine failed to produce audio
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// An external engine is not configured or failed to load
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Audio container error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Self::Audio(e.to_string())
    }
}
