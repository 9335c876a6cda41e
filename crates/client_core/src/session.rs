use std::{sync::Arc, time::Duration};

use shared::domain::{Message, MessageId};
use storage::SessionStore;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    backend::AnalysisBackend,
    message_log::MessageLog,
    mode::{ModeController, ModeKind, SessionState},
};

/// Deadline applied to every question sent to the backend.
pub const QUERY_DEADLINE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    MessageRemoved(MessageId),
    ModeChanged(ModeKind),
    Cleared,
}

/// One conversation: mode, message log and their persistence, driven by
/// uploads and questions against an analysis backend.
///
/// Operations take `&mut self`, so at most one upload or question is in
/// flight per session.
pub struct ChatSession {
    pub(crate) backend: Arc<dyn AnalysisBackend>,
    pub(crate) store: SessionStore,
    pub(crate) mode: ModeController,
    pub(crate) log: MessageLog,
    pub(crate) query_timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub fn restore(backend: Arc<dyn AnalysisBackend>, store: SessionStore) -> Self {
        let (events, _) = broadcast::channel(256);
        let mode = ModeController::restore(store.clone());
        let log = MessageLog::restore(store.clone());
        info!(
            mode = ?mode.kind(),
            messages = log.len(),
            "session: restored"
        );
        Self {
            backend,
            store,
            mode,
            log,
            query_timeout: QUERY_DEADLINE,
            events,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn state(&self) -> &SessionState {
        self.mode.state()
    }

    pub fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Starts collecting a fresh pair of files, discarding any loaded file
    /// or previous pair.
    pub fn request_comparison_mode(&mut self) {
        self.mode.enter_comparison_setup();
        info!("session: entered comparison setup");
        self.emit(SessionEvent::ModeChanged(ModeKind::ComparisonSetup));
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.mode.reset();
        info!("session: cleared history and files");
        self.emit(SessionEvent::Cleared);
    }

    pub(crate) fn push_message(&mut self, message: Message) -> MessageId {
        let appended = self.log.append(message).clone();
        let id = appended.id.clone();
        self.emit(SessionEvent::MessageAppended(appended));
        id
    }

    pub(crate) fn retract_message(&mut self, id: &MessageId) {
        if self.log.remove(id).is_some() {
            self.emit(SessionEvent::MessageRemoved(id.clone()));
        }
    }

    pub(crate) fn mode_changed(&self) {
        self.emit(SessionEvent::ModeChanged(self.mode.kind()));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
