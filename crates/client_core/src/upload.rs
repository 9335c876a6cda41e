//! Single and two-file upload flows.

use std::{collections::VecDeque, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{ComparisonPair, Message, ProcessedFile},
    protocol::BackendReply,
};
use tracing::{info, warn};

use crate::{
    backend::UploadFile,
    error::{SessionError, ValidationError},
    mode::{ComparisonProgress, ModeKind},
    session::ChatSession,
};

pub const MAX_FILES_PER_UPLOAD: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Single(ProcessedFile),
    AwaitingSecond(ProcessedFile),
    Paired(ComparisonPair),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// 1-based comparison slot this file fills.
    pub slot: usize,
    pub file: UploadFile,
}

/// Comparison uploads in the order they must be sent. Slots are fixed when
/// the queue is built, so `fileA` is always the first file the user picked.
#[derive(Debug, Default)]
pub struct UploadQueue {
    tasks: VecDeque<UploadTask>,
}

impl UploadQueue {
    pub fn starting_at(first_slot: usize, files: Vec<UploadFile>) -> Self {
        let tasks = files
            .into_iter()
            .enumerate()
            .map(|(offset, file)| UploadTask {
                slot: first_slot + offset,
                file,
            })
            .collect();
        Self { tasks }
    }

    pub fn pop_next(&mut self) -> Option<UploadTask> {
        self.tasks.pop_front()
    }

    pub fn drain_remaining(&mut self) -> Vec<UploadTask> {
        self.tasks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl ChatSession {
    /// Uploads one or two spreadsheets.
    ///
    /// One file goes through the single-file flow unless a comparison is
    /// being set up; two files always start a new comparison and are sent
    /// one after another in the given order. Every failure is also recorded
    /// in the message log.
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Result<UploadOutcome, SessionError> {
        match files.len() {
            0 => Err(self.reject_upload(ValidationError::NoFilesSelected)),
            1 if self.mode.kind() != ModeKind::ComparisonSetup => {
                let mut files = files;
                let file = files.remove(0);
                self.upload_single(file).await
            }
            1 => {
                let slot = self.mode.next_comparison_slot().unwrap_or(1);
                self.run_comparison_queue(UploadQueue::starting_at(slot, files))
                    .await
            }
            MAX_FILES_PER_UPLOAD => {
                self.request_comparison_mode();
                self.run_comparison_queue(UploadQueue::starting_at(1, files))
                    .await
            }
            count => Err(self.reject_upload(ValidationError::TooManyFiles { count })),
        }
    }

    fn reject_upload(&mut self, err: ValidationError) -> SessionError {
        warn!("upload: rejected before sending: {err}");
        let content = match &err {
            ValidationError::TooManyFiles { count } => format!(
                "❌ You selected {count} files. Upload one file for analysis or two files for comparison."
            ),
            other => format!("❌ {other}"),
        };
        self.push_message(Message::assistant(content));
        err.into()
    }

    async fn upload_single(&mut self, file: UploadFile) -> Result<UploadOutcome, SessionError> {
        let processed = self.send_upload(&file, None).await?;
        self.mode.complete_single_upload(processed.clone());
        self.mode_changed();
        self.push_message(
            Message::assistant(single_upload_message(&processed)).with_file_data(processed.clone()),
        );
        Ok(UploadOutcome::Single(processed))
    }

    async fn run_comparison_queue(
        &mut self,
        mut queue: UploadQueue,
    ) -> Result<UploadOutcome, SessionError> {
        let mut outcome = None;
        while let Some(task) = queue.pop_next() {
            match self.upload_comparison_file(task).await {
                Ok(done) => outcome = Some(done),
                Err(err) => {
                    let skipped = queue.drain_remaining();
                    if !skipped.is_empty() {
                        let names: Vec<&str> =
                            skipped.iter().map(|task| task.file.name.as_str()).collect();
                        self.push_message(Message::assistant(format!(
                            "⚠️ Not uploaded because the previous file failed: {}",
                            names.join(", ")
                        )));
                    }
                    if let [kept] = self.mode.files_in_progress() {
                        let content = kept_first_file_message(kept);
                        self.push_message(Message::assistant(content));
                    }
                    return Err(err);
                }
            }
        }
        outcome.ok_or_else(|| ValidationError::NoFilesSelected.into())
    }

    async fn upload_comparison_file(
        &mut self,
        task: UploadTask,
    ) -> Result<UploadOutcome, SessionError> {
        let processed = self.send_upload(&task.file, Some(task.slot)).await?;
        match self.mode.complete_comparison_upload(processed) {
            Ok(ComparisonProgress::AwaitingSecond(file)) => {
                self.mode_changed();
                self.push_message(
                    Message::assistant(first_comparison_file_message(&file))
                        .with_file_data(file.clone()),
                );
                Ok(UploadOutcome::AwaitingSecond(file))
            }
            Ok(ComparisonProgress::Paired(pair)) => {
                info!(
                    file_a = %pair.file_a.original_name,
                    file_b = %pair.file_b.original_name,
                    "upload: comparison pair ready"
                );
                self.mode_changed();
                self.push_message(Message::assistant(comparison_ready_message(&pair)));
                Ok(UploadOutcome::Paired(pair))
            }
            Err(err) => {
                self.push_message(Message::assistant(format!("❌ {err}")));
                Err(err.into())
            }
        }
    }

    /// Sends one file, bracketed by a transient "uploading" notice. On
    /// failure the error is logged as an assistant message and state is
    /// left untouched.
    async fn send_upload(
        &mut self,
        file: &UploadFile,
        slot: Option<usize>,
    ) -> Result<ProcessedFile, SessionError> {
        let notice = match slot {
            Some(slot) => format!(
                "Uploading file {slot} of {MAX_FILES_PER_UPLOAD}: {}...",
                file.name
            ),
            None => format!("Uploading file: {}...", file.name),
        };
        let placeholder = self.push_message(Message::system(notice));

        let backend = Arc::clone(&self.backend);
        let reply = backend.upload(file).await;
        self.retract_message(&placeholder);

        let result = match reply {
            Ok(BackendReply::Success(reply)) if !reply.id.as_str().is_empty() => {
                let mut processed = reply.into_processed_file(Utc::now());
                if processed.original_name.is_empty() {
                    processed.original_name = file.name.clone();
                }
                Ok(processed)
            }
            Ok(BackendReply::Success(_)) => Err(SessionError::Rejected(
                "backend did not return a file id".to_string(),
            )),
            Ok(BackendReply::Failure(failure)) => {
                Err(SessionError::Rejected(failure.message().to_string()))
            }
            Err(err) => Err(SessionError::Backend(err)),
        };

        match result {
            Ok(processed) => {
                info!(
                    file = %processed.original_name,
                    data_id = %processed.id,
                    sheets = processed.sheets.len(),
                    "upload: file processed"
                );
                Ok(processed)
            }
            Err(err) => {
                warn!(file = %file.name, "upload: failed: {err}");
                let content = match &err {
                    SessionError::Rejected(message) => {
                        format!("❌ Error uploading file: {message}")
                    }
                    other => format!("❌ Failed to upload file: {other}"),
                };
                self.push_message(Message::assistant(content));
                Err(err)
            }
        }
    }
}

fn single_upload_message(file: &ProcessedFile) -> String {
    format!(
        "✅ File uploaded successfully!\n\n**{}**\n{}\n\nYou can now ask questions about your data. Try asking things like:\n- \"What are the main trends in this data?\"\n- \"Show me a summary of all columns\"\n- \"Are there any outliers?\"",
        file.original_name, file.summary
    )
}

fn first_comparison_file_message(file: &ProcessedFile) -> String {
    format!(
        "✅ File 1 of 2 uploaded: **{}**\n{}\n\nUpload the second file to start the comparison.",
        file.original_name, file.summary
    )
}

fn kept_first_file_message(file: &ProcessedFile) -> String {
    format!(
        "ℹ️ File 1 of 2 (**{}**) is kept. Upload the second file again to start the comparison.",
        file.original_name
    )
}

fn comparison_ready_message(pair: &ComparisonPair) -> String {
    format!(
        "✅ Both files are ready for comparison!\n\n**File A:** {}\n{}\n\n**File B:** {}\n{}\n\nAsk questions that compare the two files, for example:\n- \"What changed between the two files?\"\n- \"Which rows differ?\"",
        pair.file_a.original_name,
        pair.file_a.summary,
        pair.file_b.original_name,
        pair.file_b.summary
    )
}
