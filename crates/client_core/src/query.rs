//! Question dispatch for single-file and comparison modes.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{AnalysisResult, DataId, Message},
    protocol::{BackendReply, CompareRequest, QueryReply, QueryRequest},
};
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::{
    error::{BackendError, SessionError, ValidationError},
    mode::SessionState,
    session::ChatSession,
};

pub const PROCESSING_PLACEHOLDER: &str =
    "⏳ Processing your data, this may take a few minutes...";
pub const NO_FILE_MESSAGE: &str = "❌ No file found. Please upload an Excel file first.";
const CONNECTION_MESSAGE: &str = "❌ Error processing request: connection problem. Check your network connection or try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryTarget {
    Single(DataId),
    Comparison { file_a: DataId, file_b: DataId },
}

impl ChatSession {
    /// Asks a question about the loaded file, or about both files of the
    /// comparison pair.
    ///
    /// The answer (or the error) is appended to the message log; the
    /// placeholder shown while waiting is removed in every case.
    pub async fn query(&mut self, question: &str) -> Result<AnalysisResult, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }

        let Some(target) = self.query_target() else {
            let mode = self.mode.kind();
            warn!(?mode, "query: refused, no file loaded");
            self.push_message(Message::assistant(NO_FILE_MESSAGE));
            return Err(ValidationError::NoFileLoaded { mode }.into());
        };

        self.push_message(Message::user(question));
        let placeholder = self.push_message(Message::assistant(PROCESSING_PLACEHOLDER));

        let started = Instant::now();
        let reply = self.dispatch(&target, question).await;
        self.retract_message(&placeholder);

        match reply {
            Ok(BackendReply::Success(reply)) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    has_interpretation = reply.interpretation.is_some(),
                    "query: answered"
                );
                let analysis = reply.analysis_result();
                self.push_message(
                    Message::assistant(answer_content(&reply)).with_analysis_result(analysis.clone()),
                );
                Ok(analysis)
            }
            Ok(BackendReply::Failure(failure)) => {
                let message = failure.message().to_string();
                warn!("query: backend reported failure: {message}");
                self.push_message(Message::assistant(format!(
                    "❌ Error processing query: {message}"
                )));
                Err(SessionError::Rejected(message))
            }
            Err(err) => {
                warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query: failed: {err}"
                );
                let content = match &err {
                    BackendError::Timeout => timeout_message(self.query_timeout),
                    BackendError::Transport(_) => CONNECTION_MESSAGE.to_string(),
                    BackendError::InvalidResponse(detail) => {
                        format!("❌ Error processing request: {detail}")
                    }
                };
                self.push_message(Message::assistant(content));
                Err(err.into())
            }
        }
    }

    /// Falls back to the persisted current file when memory has none yet.
    fn query_target(&self) -> Option<QueryTarget> {
        match self.mode.state() {
            SessionState::Comparison { pair } => Some(QueryTarget::Comparison {
                file_a: pair.file_a.id.clone(),
                file_b: pair.file_b.id.clone(),
            }),
            SessionState::Single {
                current_file: Some(file),
            } => Some(QueryTarget::Single(file.id.clone())),
            SessionState::Single { current_file: None } => self
                .store
                .load_current_file()
                .map(|file| QueryTarget::Single(file.id)),
            SessionState::ComparisonSetup { .. } => None,
        }
    }

    async fn dispatch(
        &self,
        target: &QueryTarget,
        question: &str,
    ) -> Result<BackendReply<QueryReply>, BackendError> {
        let backend = Arc::clone(&self.backend);
        let call = async move {
            match target {
                QueryTarget::Single(data_id) => {
                    backend
                        .query(&QueryRequest {
                            question: question.to_string(),
                            data_id: data_id.clone(),
                        })
                        .await
                }
                QueryTarget::Comparison { file_a, file_b } => {
                    backend
                        .compare(&CompareRequest {
                            question: question.to_string(),
                            data_id_1: file_a.clone(),
                            data_id_2: file_b.clone(),
                        })
                        .await
                }
            }
        };
        timeout(self.query_timeout, call)
            .await
            .unwrap_or(Err(BackendError::Timeout))
    }
}

fn answer_content(reply: &QueryReply) -> String {
    match reply.interpretation.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => {
            let pretty = serde_json::to_string_pretty(&reply.result)
                .unwrap_or_else(|_| reply.result.to_string());
            format!("📊 Data analysis:\n\n{pretty}")
        }
    }
}

fn timeout_message(deadline: Duration) -> String {
    format!(
        "❌ Error processing request: the request took too long (more than {}). Try simplifying the question or splitting the data into smaller parts.",
        describe_duration(deadline)
    )
}

fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    } else if secs >= 1 {
        format!("{secs} seconds")
    } else {
        format!("{} ms", duration.as_millis())
    }
}
