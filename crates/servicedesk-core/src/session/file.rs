use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SessionStore;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    values: HashMap<String, String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Session store persisted as JSON, surviving process restarts.
///
/// Every mutation rewrites the whole file while holding the lock, so
/// concurrent writers in one process cannot interleave partial writes.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    state: Mutex<SessionFile>,
}

impl FileSessionStore {
    /// Open the store in `cache_dir`, loading any existing session file.
    pub fn open(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let path = cache_dir.as_ref().join(SESSION_FILE);
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            serde_json::from_str(&contents).context("Failed to parse session file")?
        } else {
            SessionFile::default()
        };
        debug!(path = %path.display(), keys = state.values.len(), "Session store opened");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the session was last written, if ever
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.lock().updated_at
    }

    fn lock(&self) -> MutexGuard<'_, SessionFile> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, state: &SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state.values.insert(key.to_string(), value.to_string());
        state.updated_at = Some(Utc::now());
        self.save(&state)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        if state.values.remove(key).is_some() {
            state.updated_at = Some(Utc::now());
            self.save(&state)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        // Reset memory only after the file is gone
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        *state = SessionFile::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AUTH_TOKEN_KEY;

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileSessionStore::open(dir.path()).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);
        assert!(store.updated_at().is_none());
        store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();
        assert!(store.updated_at().is_some());

        let reopened = FileSessionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(AUTH_TOKEN_KEY).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path()).unwrap();
        store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();
        store.set("userName", "admin").unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get("userName"), None);

        let reopened = FileSessionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(AUTH_TOKEN_KEY), None);
    }

    #[test]
    fn test_file_store_clear_keeps_state_when_removal_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path()).unwrap();
        store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();

        // A directory in place of the session file cannot be removed as a file
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();

        assert!(store.clear().is_err());
        assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_file_store_remove_single_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path()).unwrap();
        store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();
        store.set("userName", "admin").unwrap();

        store.remove(AUTH_TOKEN_KEY).unwrap();
        let reopened = FileSessionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(AUTH_TOKEN_KEY), None);
        assert_eq!(reopened.get("userName").as_deref(), Some("admin"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        assert!(FileSessionStore::open(dir.path()).is_err());
    }
}
