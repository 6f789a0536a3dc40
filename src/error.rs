use std::fmt;

use thiserror::Error;

use crate::auth::AuthError;

/// Errors that abort a run before any work is dispatched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read queue file {path}: {source}")]
    QueueFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("token acquisition failed: {0}")]
    Token(#[from] AuthError),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single work item. Never fatal to the run.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("encoding payload to json: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("performing request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("unexpected response {status}")]
    UnexpectedStatus { status: reqwest::StatusCode },

    #[error("removing line from queue file: {0}")]
    QueueMutation(#[source] std::io::Error),

    #[error("decoding json response: {0}")]
    Decoding(#[source] reqwest::Error),
}

/// Classification of an [`ItemError`], used for reporting and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Encoding,
    Transport,
    Timeout,
    UnexpectedStatus,
    QueueMutation,
    Decoding,
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ItemError::Encoding(_) => ErrorKind::Encoding,
            ItemError::Transport(_) => ErrorKind::Transport,
            ItemError::Timeout(_) => ErrorKind::Timeout,
            ItemError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            ItemError::QueueMutation(_) => ErrorKind::QueueMutation,
            ItemError::Decoding(_) => ErrorKind::Decoding,
        }
    }

    /// Whether this failure is recorded in the failure log.
    pub fn is_logged_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::UnexpectedStatus)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Encoding => write!(f, "EncodingError"),
            ErrorKind::Transport => write!(f, "TransportError"),
            ErrorKind::Timeout => write!(f, "TimeoutError"),
            ErrorKind::UnexpectedStatus => write!(f, "UnexpectedStatus"),
            ErrorKind::QueueMutation => write!(f, "QueueMutationError"),
            ErrorKind::Decoding => write!(f, "DecodingError"),
        }
    }
}
