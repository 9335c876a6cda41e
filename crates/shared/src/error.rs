use serde::{Deserialize, Serialize};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Failure body returned by every backend endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            details: None,
        }
    }

    /// `error`, else `details`, else a generic placeholder.
    pub fn message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.details.as_deref().filter(|d| !d.is_empty()))
            .unwrap_or(UNKNOWN_ERROR)
    }
}
