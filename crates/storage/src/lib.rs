//! Durable key-value persistence for chat sessions.
//!
//! [`KeyValueStore`] is the opaque string store the session depends on;
//! [`SessionStore`] layers typed, versioned, corruption-tolerant access on top.

use anyhow::Result;

mod file_store;
mod memory_store;
mod session_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use session_store::{SessionKey, SessionStore, SCHEMA_VERSION};

/// Synchronous string store. Every `set` replaces the whole value for a key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
