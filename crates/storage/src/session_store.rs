use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::domain::{ComparisonPair, Message, ProcessedFile};
use tracing::{info, warn};

use crate::{KeyValueStore, MemoryStore};

/// Version written into every persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    ChatHistory,
    CurrentFile,
    ComparisonPair,
    ComparisonFilesInProgress,
}

impl SessionKey {
    pub const ALL: [SessionKey; 4] = [
        SessionKey::ChatHistory,
        SessionKey::CurrentFile,
        SessionKey::ComparisonPair,
        SessionKey::ComparisonFilesInProgress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKey::ChatHistory => "excel-chat-history",
            SessionKey::CurrentFile => "excel-chat-current-file",
            SessionKey::ComparisonPair => "excel-chat-comparison-pair",
            SessionKey::ComparisonFilesInProgress => "excel-chat-comparison-files",
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

enum Decoded<T> {
    Current(T),
    /// Pre-envelope payload that still parses as the current shape.
    Migrated(T),
    Discard(String),
}

fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => return Decoded::Discard(format!("invalid json: {err}")),
    };

    let is_envelope = value
        .as_object()
        .is_some_and(|obj| obj.len() == 2 && obj.contains_key("version") && obj.contains_key("data"));

    if !is_envelope {
        return match serde_json::from_value::<T>(value) {
            Ok(data) => Decoded::Migrated(data),
            Err(err) => Decoded::Discard(format!("unrecognized legacy payload: {err}")),
        };
    }

    let envelope: Envelope = match serde_json::from_value(value) {
        Ok(envelope) => envelope,
        Err(err) => return Decoded::Discard(format!("invalid envelope: {err}")),
    };
    if envelope.version != SCHEMA_VERSION {
        return Decoded::Discard(format!(
            "unsupported schema version {} (expected {SCHEMA_VERSION})",
            envelope.version
        ));
    }
    match serde_json::from_value::<T>(envelope.data) {
        Ok(data) => Decoded::Current(data),
        Err(err) => Decoded::Discard(format!("payload does not match schema: {err}")),
    }
}

/// Typed view over a [`KeyValueStore`]. Cloning shares the same backing store.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Returns the stored value, or `None` when absent or unreadable.
    ///
    /// Payloads that no longer match the expected shape are removed so the
    /// next start does not trip over them again.
    pub fn load<T: DeserializeOwned + Serialize>(&self, key: SessionKey) -> Option<T> {
        let raw = match self.backend.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = key.as_str(), "store: read failed, treating as absent: {err:#}");
                return None;
            }
        };

        match decode::<T>(&raw) {
            Decoded::Current(data) => Some(data),
            Decoded::Migrated(data) => {
                info!(key = key.as_str(), "store: migrating unversioned payload");
                if let Err(err) = self.save(key, &data) {
                    warn!(key = key.as_str(), "store: failed to rewrite migrated payload: {err:#}");
                }
                Some(data)
            }
            Decoded::Discard(reason) => {
                warn!(key = key.as_str(), reason = %reason, "store: dropping corrupt payload");
                if let Err(err) = self.backend.remove(key.as_str()) {
                    warn!(key = key.as_str(), "store: failed to remove corrupt payload: {err:#}");
                }
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: SessionKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(&EnvelopeRef {
            version: SCHEMA_VERSION,
            data: value,
        })
        .with_context(|| format!("failed to encode '{}'", key.as_str()))?;
        self.backend
            .set(key.as_str(), &raw)
            .with_context(|| format!("failed to persist '{}'", key.as_str()))
    }

    pub fn clear(&self, key: SessionKey) -> Result<()> {
        self.backend
            .remove(key.as_str())
            .with_context(|| format!("failed to clear '{}'", key.as_str()))
    }

    /// Removes every session key, attempting all of them before reporting
    /// the first failure.
    pub fn clear_all(&self) -> Result<()> {
        let mut first_err = None;
        for key in SessionKey::ALL {
            if let Err(err) = self.clear(key) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn load_messages(&self) -> Vec<Message> {
        self.load(SessionKey::ChatHistory).unwrap_or_default()
    }

    pub fn load_current_file(&self) -> Option<ProcessedFile> {
        self.load(SessionKey::CurrentFile)
    }

    pub fn load_comparison_pair(&self) -> Option<ComparisonPair> {
        self.load(SessionKey::ComparisonPair)
    }

    pub fn load_files_in_progress(&self) -> Vec<ProcessedFile> {
        self.load(SessionKey::ComparisonFilesInProgress)
            .unwrap_or_default()
    }
}
