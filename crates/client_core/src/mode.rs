//! Analysis mode state machine: single file, comparison setup, comparison.

use serde::Serialize;
use shared::domain::{ComparisonPair, ProcessedFile};
use storage::{SessionKey, SessionStore};
use tracing::{info, warn};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Single,
    ComparisonSetup,
    Comparison,
}

/// Each variant carries exactly the files its mode allows, so a pair and a
/// current file can never coexist.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Single { current_file: Option<ProcessedFile> },
    ComparisonSetup { pending: Option<ProcessedFile> },
    Comparison { pair: ComparisonPair },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Single { current_file: None }
    }
}

impl SessionState {
    pub fn kind(&self) -> ModeKind {
        match self {
            SessionState::Single { .. } => ModeKind::Single,
            SessionState::ComparisonSetup { .. } => ModeKind::ComparisonSetup,
            SessionState::Comparison { .. } => ModeKind::Comparison,
        }
    }

    pub fn current_file(&self) -> Option<&ProcessedFile> {
        match self {
            SessionState::Single { current_file } => current_file.as_ref(),
            _ => None,
        }
    }

    pub fn comparison_pair(&self) -> Option<&ComparisonPair> {
        match self {
            SessionState::Comparison { pair } => Some(pair),
            _ => None,
        }
    }

    pub fn files_in_progress(&self) -> &[ProcessedFile] {
        match self {
            SessionState::ComparisonSetup { pending: Some(file) } => std::slice::from_ref(file),
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonProgress {
    AwaitingSecond(ProcessedFile),
    Paired(ComparisonPair),
}

pub struct ModeController {
    state: SessionState,
    store: SessionStore,
}

impl ModeController {
    /// Rebuilds the mode from persisted keys: a stored pair wins, then a
    /// current file, then a half-finished comparison setup.
    pub fn restore(store: SessionStore) -> Self {
        let state = if let Some(pair) = store.load_comparison_pair() {
            info!(
                file_a = %pair.file_a.original_name,
                file_b = %pair.file_b.original_name,
                "session: restored comparison pair"
            );
            SessionState::Comparison { pair }
        } else if let Some(file) = store.load_current_file() {
            info!(file = %file.original_name, "session: restored current file");
            SessionState::Single {
                current_file: Some(file),
            }
        } else {
            let mut in_progress = store.load_files_in_progress();
            if in_progress.len() == 1 {
                let file = in_progress.remove(0);
                info!(file = %file.original_name, "session: restored incomplete comparison setup");
                SessionState::ComparisonSetup {
                    pending: Some(file),
                }
            } else {
                SessionState::default()
            }
        };
        Self { state, store }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn kind(&self) -> ModeKind {
        self.state.kind()
    }

    pub fn current_file(&self) -> Option<&ProcessedFile> {
        self.state.current_file()
    }

    pub fn comparison_pair(&self) -> Option<&ComparisonPair> {
        self.state.comparison_pair()
    }

    pub fn files_in_progress(&self) -> &[ProcessedFile] {
        self.state.files_in_progress()
    }

    /// 1-based slot the next comparison upload fills, if collecting.
    pub fn next_comparison_slot(&self) -> Option<usize> {
        match &self.state {
            SessionState::ComparisonSetup { pending } => Some(usize::from(pending.is_some()) + 1),
            _ => None,
        }
    }

    pub fn enter_comparison_setup(&mut self) {
        self.state = SessionState::ComparisonSetup { pending: None };
        self.forget(SessionKey::CurrentFile);
        self.forget(SessionKey::ComparisonPair);
        self.forget(SessionKey::ComparisonFilesInProgress);
    }

    pub fn complete_single_upload(&mut self, file: ProcessedFile) {
        self.persist(SessionKey::CurrentFile, &file);
        self.forget(SessionKey::ComparisonPair);
        self.forget(SessionKey::ComparisonFilesInProgress);
        self.state = SessionState::Single {
            current_file: Some(file),
        };
    }

    pub fn complete_comparison_upload(
        &mut self,
        file: ProcessedFile,
    ) -> Result<ComparisonProgress, ValidationError> {
        let pending = match &mut self.state {
            SessionState::ComparisonSetup { pending } => pending.take(),
            other => {
                return Err(ValidationError::NotCollectingComparisonFiles { mode: other.kind() })
            }
        };

        match pending {
            None => {
                self.persist(SessionKey::ComparisonFilesInProgress, &vec![file.clone()]);
                self.forget(SessionKey::CurrentFile);
                self.state = SessionState::ComparisonSetup {
                    pending: Some(file.clone()),
                };
                Ok(ComparisonProgress::AwaitingSecond(file))
            }
            Some(first) => {
                let pair = ComparisonPair {
                    file_a: first,
                    file_b: file,
                };
                // Pair first: if the process dies before the cleanup below,
                // restore still prefers the pair.
                self.persist(SessionKey::ComparisonPair, &pair);
                self.forget(SessionKey::ComparisonFilesInProgress);
                self.forget(SessionKey::CurrentFile);
                self.state = SessionState::Comparison { pair: pair.clone() };
                Ok(ComparisonProgress::Paired(pair))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.forget(SessionKey::CurrentFile);
        self.forget(SessionKey::ComparisonPair);
        self.forget(SessionKey::ComparisonFilesInProgress);
    }

    fn persist<T: Serialize>(&self, key: SessionKey, value: &T) {
        if let Err(err) = self.store.save(key, value) {
            warn!(key = key.as_str(), "session: failed to persist mode state: {err:#}");
        }
    }

    fn forget(&self, key: SessionKey) {
        if let Err(err) = self.store.clear(key) {
            warn!(key = key.as_str(), "session: failed to clear mode state: {err:#}");
        }
    }
}
