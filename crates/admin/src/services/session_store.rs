//! Durable local session persistence.
//!
//! The dashboard remembers which user/store pair last authenticated so a
//! returning owner with a live provider session skips the login screen.
//! This is the desktop analog of browser local storage: writes are
//! best-effort and never block sign-in, so the trait is infallible and
//! implementations log failures instead of surfacing them.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::SessionRecord;

/// Persists the session identity across dashboard restarts.
pub trait SessionStore: Send + Sync {
    /// Persist the record, replacing any previous one.
    fn save(&self, record: &SessionRecord);

    /// Load the persisted record, if any.
    fn load(&self) -> Option<SessionRecord>;

    /// Remove the persisted record.
    fn clear(&self);
}

/// In-memory [`SessionStore`], for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, record: &SessionRecord) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(record.clone());
        }
    }

    fn load(&self) -> Option<SessionRecord> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// [`SessionStore`] backed by a JSON file on disk.
///
/// The file holds a single object with the `userId`/`projectId` keys from
/// [`crate::models::session_keys`].
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store writing to the given path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, record: &SessionRecord) {
        let json = match serde_json::to_string_pretty(record) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize session record");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, json) {
            tracing::warn!(error = %err, path = %self.path.display(), "failed to persist session");
        }
    }

    fn load(&self) -> Option<SessionRecord> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring corrupt session file");
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %err, "failed to clear persisted session");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clementine_core::{StoreId, UserId};

    fn record() -> SessionRecord {
        SessionRecord {
            user_id: UserId::new("uid_1"),
            store_id: StoreId::new("store1"),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load().is_none());

        store.save(&record());
        assert_eq!(store.load(), Some(record()));

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("clementine-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = FileSessionStore::new(dir.join("session.json"));

        store.save(&record());
        assert_eq!(store.load(), Some(record()));

        store.clear();
        assert!(store.load().is_none());

        // Clearing an already-clear store is fine.
        store.clear();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
