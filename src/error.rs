use thiserror::Error;

/// Errors surfaced by the orchestrator's control operations.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Download already in progress")]
    AlreadyInProgress,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

/// Reasons a host refuses to start a download.
///
/// These never abort a batch; the orchestrator counts them as failed items.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download rejected: {0}")]
    Rejected(String),
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Rejected(format!("{:#}", err))
    }
}

/// Delivery failure for a single observer.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The observer is gone; it will be dropped from the set.
    #[error("Observer disconnected")]
    Closed,

    #[error("Event emission failed: {0}")]
    Emit(String),
}
