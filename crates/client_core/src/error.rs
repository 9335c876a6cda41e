//! Failure taxonomy for session operations.

use thiserror::Error;

use crate::mode::ModeKind;

/// Problems detected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no files selected")]
    NoFilesSelected,
    #[error("too many files selected: {count} (at most 2 can be uploaded at once)")]
    TooManyFiles { count: usize },
    #[error("no file loaded for mode {mode:?}")]
    NoFileLoaded { mode: ModeKind },
    #[error("question is empty")]
    EmptyQuestion,
    #[error("comparison upload requires comparison setup mode, current mode is {mode:?}")]
    NotCollectingComparisonFiles { mode: ModeKind },
}

/// Failures talking to the analysis backend that never produced a reply body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() || err.is_body() {
            BackendError::InvalidResponse(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The backend answered with its failure shape.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Backend(BackendError::Timeout))
    }
}
