// Error types for authorder
// Startup failures are fatal, per-request failures are recovered by the prober

use thiserror::Error;

/// Errors surfaced by the probing engine and its collaborators.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Incomplete or inconsistent run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A target identifier that is not a well-formed ARN.
    #[error("invalid ARN `{arn}`: {reason}")]
    InvalidArn { arn: String, reason: String },

    /// The request could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Network or protocol failure while talking to the service.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A single request exceeded the configured bound.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// True for failures that only invalidate the current mutation.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProbeError::Transport(_) | ProbeError::Timeout(_))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Transport(format!("timed out: {}", err))
        } else {
            ProbeError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
