//! Client-side session core for spreadsheet chat: tracks the analysis mode,
//! drives uploads and questions against the analysis backend, and keeps the
//! conversation durable across restarts.

pub mod backend;
pub mod error;
mod message_log;
pub mod mode;
mod query;
mod session;
mod upload;

pub use backend::{AnalysisBackend, HttpAnalysisBackend, UploadFile};
pub use error::{BackendError, SessionError, ValidationError};
pub use message_log::MessageLog;
pub use mode::{ComparisonProgress, ModeController, ModeKind, SessionState};
pub use query::{NO_FILE_MESSAGE, PROCESSING_PLACEHOLDER};
pub use session::{ChatSession, SessionEvent, QUERY_DEADLINE};
pub use upload::{UploadOutcome, UploadQueue, UploadTask, MAX_FILES_PER_UPLOAD};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
