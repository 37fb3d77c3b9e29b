//! Persistence port for the conversation state
//!
//! The store loads once when it is constructed and writes the full state back
//! after every mutation. Implementations only need to move one serialized
//! snapshot in and out under a namespace key.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::PersistenceError;
use crate::models::{ActiveChat, Message, Theme, User};

/// Everything that survives a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub messages: Vec<Message>,
    pub users: Vec<User>,
    pub current_user: User,
    pub active_chat: ActiveChat,
    #[serde(default)]
    pub theme: Theme,
}

pub trait StatePersistence: Send {
    /// Read the stored state, `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;

    /// Replace the stored state
    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// One JSON document per namespace key inside a directory
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path, key: &str) -> Self {
        JsonFileStore {
            path: dir.join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatePersistence for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let state: PersistedState = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} messages from {}",
            state.messages.len(),
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state)?;
        // Write next to the target and rename so a crash never leaves half a file
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("Saved conversation state to {}", self.path.display());
        Ok(())
    }
}

/// In-memory persistence. Clones share the same backing slot, so a test can
/// keep one handle and inspect what the store wrote through another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemorySlot>>,
}

#[derive(Default)]
struct MemorySlot {
    json: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the slot with raw text, e.g. a corrupted document
    pub fn with_raw(json: &str) -> Self {
        let store = MemoryStore::new();
        store.lock().json = Some(json.to_string());
        store
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn stored(&self) -> Option<PersistedState> {
        let slot = self.lock();
        slot.json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatePersistence for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let slot = self.lock();
        match slot.json.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        let mut slot = self.lock();
        slot.json = Some(json);
        slot.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageStatus, UserStatus};
    use chrono::Utc;

    fn sample_state() -> PersistedState {
        let user = User::new("user1", "You");
        PersistedState {
            messages: vec![Message {
                id: "msg_1".to_string(),
                user_id: "user1".to_string(),
                text: "Hello".to_string(),
                formatted_text: Some("Hello".to_string()),
                audio_url: None,
                timestamp: Utc::now(),
                status: MessageStatus::Delivered,
            }],
            users: vec![user.clone(), User::new("ai", "EduAI")],
            current_user: user,
            active_chat: ActiveChat {
                id: "chat1".to_string(),
                name: "Educational AI Chat".to_string(),
                typing: false,
            },
            theme: Theme::Dark,
        }
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "chat-storage");
        assert!(store.load().unwrap().is_none());

        let state = sample_state();
        store.save(&state).unwrap();
        assert!(store.path().ends_with("chat-storage.json"));
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn test_json_uses_camel_case_field_names() {
        let json = serde_json::to_string(&sample_state()).unwrap();
        assert!(json.contains("\"currentUser\""));
        assert!(json.contains("\"activeChat\""));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"status\":\"delivered\""));
        assert!(json.contains("\"theme\":\"dark\""));
    }

    #[test]
    fn test_memory_store_counts_saves_and_shares_slot() {
        let store = MemoryStore::new();
        let handle = store.clone();
        assert!(store.load().unwrap().is_none());

        let mut state = sample_state();
        store.save(&state).unwrap();
        state.users[1].status = UserStatus::Offline;
        store.save(&state).unwrap();

        assert_eq!(handle.save_count(), 2);
        assert_eq!(handle.stored().unwrap().users[1].status, UserStatus::Offline);
    }

    #[test]
    fn test_memory_store_reports_corrupt_state() {
        let store = MemoryStore::with_raw("{ broken");
        match store.load() {
            Err(PersistenceError::Json(_)) => (),
            other => panic!("Expected JSON error, got {:?}", other.map(|_| ())),
        }
    }
}
