use shared::domain::{Message, MessageId};
use storage::{SessionKey, SessionStore};
use tracing::warn;

/// Ordered conversation record, resaved after every change.
pub struct MessageLog {
    messages: Vec<Message>,
    store: SessionStore,
}

impl MessageLog {
    pub fn restore(store: SessionStore) -> Self {
        let messages = store.load_messages();
        Self { messages, store }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == id)
    }

    pub fn append(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        self.persist();
        &self.messages[self.messages.len() - 1]
    }

    /// Retracts a placeholder. Returns the removed message, if it was present.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|message| &message.id == id)?;
        let removed = self.messages.remove(index);
        self.persist();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(err) = self.store.clear(SessionKey::ChatHistory) {
            warn!("session: failed to clear chat history: {err:#}");
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(SessionKey::ChatHistory, &self.messages) {
            warn!(
                messages = self.messages.len(),
                "session: failed to persist chat history: {err:#}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_remove_are_persisted() {
        let store = SessionStore::in_memory();
        let mut log = MessageLog::restore(store.clone());

        let user_id = log.append(Message::user("hello")).id.clone();
        let placeholder_id = log.append(Message::assistant("working")).id.clone();
        assert_eq!(store.load_messages().len(), 2);

        let removed = log.remove(&placeholder_id).expect("placeholder present");
        assert_eq!(removed.content, "working");
        assert!(log.remove(&placeholder_id).is_none());

        let reloaded = MessageLog::restore(store);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.messages()[0].id, user_id);
    }

    #[test]
    fn clear_empties_log_and_store() {
        let store = SessionStore::in_memory();
        let mut log = MessageLog::restore(store.clone());
        log.append(Message::system("Uploading file: a.xlsx..."));

        log.clear();

        assert!(log.is_empty());
        assert!(store
            .backend()
            .get(SessionKey::ChatHistory.as_str())
            .expect("get")
            .is_none());
    }
}
