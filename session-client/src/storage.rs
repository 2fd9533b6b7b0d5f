//! Persisted session state: two mutually exclusive storage tiers.
//!
//! The durable tier survives restarts ("remember me"), the tab-scoped
//! tier does not. Both hold the same three fixed keys. Mutual exclusion
//! is enforced in one place (`SessionStore::persist` / `clear_all`)
//! rather than scattered through callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::UserProfile;
use crate::error::SessionError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

/// Which tier holds the session, chosen by "remember me" at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    Durable,
    TabScoped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Flat key-value persistence with web-storage semantics.
pub trait TokenStorage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Tab-scoped tier: lives and dies with the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .map_err(|_| SessionError::Storage("storage lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| SessionError::Storage("storage lock poisoned".to_string()))?
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .map_err(|_| SessionError::Storage("storage lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}

/// Durable tier: one file per key under a state directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| SessionError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl TokenStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        std::fs::write(self.path(key), value)
            .map_err(|e| SessionError::Storage(format!("write {key}: {e}")))
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Storage(format!("read {key}: {e}"))),
        }
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(format!("remove {key}: {e}"))),
        }
    }
}

/// The two tiers together, with the exclusivity invariant.
#[derive(Clone)]
pub struct SessionStore {
    durable: Arc<dyn TokenStorage>,
    tab_scoped: Arc<dyn TokenStorage>,
}

impl SessionStore {
    pub fn new(durable: Arc<dyn TokenStorage>, tab_scoped: Arc<dyn TokenStorage>) -> Self {
        Self {
            durable,
            tab_scoped,
        }
    }

    /// In-memory both sides; handy default for tests and headless use.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn tier(&self, tier: StorageTier) -> &Arc<dyn TokenStorage> {
        match tier {
            StorageTier::Durable => &self.durable,
            StorageTier::TabScoped => &self.tab_scoped,
        }
    }

    fn other(tier: StorageTier) -> StorageTier {
        match tier {
            StorageTier::Durable => StorageTier::TabScoped,
            StorageTier::TabScoped => StorageTier::Durable,
        }
    }

    /// Write the session to one tier, clearing the other first so the
    /// two are never populated at once.
    pub fn persist(&self, tier: StorageTier, data: &SessionData) -> Result<(), SessionError> {
        self.clear_tier(Self::other(tier))?;

        let storage = self.tier(tier);
        storage.set(ACCESS_TOKEN_KEY, &data.access_token)?;
        storage.set(REFRESH_TOKEN_KEY, &data.refresh_token)?;
        let user = serde_json::to_string(&data.user)
            .map_err(|e| SessionError::Storage(format!("serialize profile: {e}")))?;
        storage.set(USER_KEY, &user)?;
        Ok(())
    }

    /// Load whichever tier holds a complete session, durable first.
    pub fn restore(&self) -> Result<Option<(StorageTier, SessionData)>, SessionError> {
        for tier in [StorageTier::Durable, StorageTier::TabScoped] {
            if let Some(data) = self.load_tier(tier)? {
                return Ok(Some((tier, data)));
            }
        }
        Ok(None)
    }

    pub fn load_tier(&self, tier: StorageTier) -> Result<Option<SessionData>, SessionError> {
        let storage = self.tier(tier);
        let (Some(access_token), Some(refresh_token), Some(user)) = (
            storage.get(ACCESS_TOKEN_KEY)?,
            storage.get(REFRESH_TOKEN_KEY)?,
            storage.get(USER_KEY)?,
        ) else {
            return Ok(None);
        };

        let user: UserProfile = serde_json::from_str(&user)
            .map_err(|e| SessionError::Storage(format!("parse profile: {e}")))?;

        Ok(Some(SessionData {
            access_token,
            refresh_token,
            user,
        }))
    }

    fn clear_tier(&self, tier: StorageTier) -> Result<(), SessionError> {
        let storage = self.tier(tier);
        storage.remove(ACCESS_TOKEN_KEY)?;
        storage.remove(REFRESH_TOKEN_KEY)?;
        storage.remove(USER_KEY)?;
        Ok(())
    }

    /// Both tiers, unconditionally. The logout path calls this even
    /// when it thinks it knows which tier is live.
    pub fn clear_all(&self) -> Result<(), SessionError> {
        self.clear_tier(StorageTier::Durable)?;
        self.clear_tier(StorageTier::TabScoped)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use uuid::Uuid;

    fn sample_data() -> SessionData {
        SessionData {
            access_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
            user: UserProfile {
                user_id: Uuid::new_v4(),
                username: "client1".to_string(),
                email: "client1@example.com".to_string(),
                first_name: "Cleo".to_string(),
                last_name: "Client".to_string(),
                user_role: Role::Client,
                profile_pic: None,
            },
        }
    }

    #[test]
    fn persist_clears_the_other_tier() {
        let store = SessionStore::in_memory();
        let data = sample_data();

        store.persist(StorageTier::Durable, &data).unwrap();
        assert!(store.load_tier(StorageTier::Durable).unwrap().is_some());
        assert!(store.load_tier(StorageTier::TabScoped).unwrap().is_none());

        // Switching tiers moves the session, never duplicates it
        store.persist(StorageTier::TabScoped, &data).unwrap();
        assert!(store.load_tier(StorageTier::Durable).unwrap().is_none());
        assert!(store.load_tier(StorageTier::TabScoped).unwrap().is_some());
    }

    #[test]
    fn restore_prefers_durable_and_round_trips() {
        let store = SessionStore::in_memory();
        let data = sample_data();

        assert!(store.restore().unwrap().is_none());

        store.persist(StorageTier::Durable, &data).unwrap();
        let (tier, restored) = store.restore().unwrap().unwrap();
        assert_eq!(tier, StorageTier::Durable);
        assert_eq!(restored, data);
    }

    #[test]
    fn partial_tier_is_not_a_session() {
        let store = SessionStore::in_memory();
        store
            .tier(StorageTier::Durable)
            .set(ACCESS_TOKEN_KEY, "a.b.c")
            .unwrap();

        assert!(store.restore().unwrap().is_none());
    }

    #[test]
    fn clear_all_empties_both_tiers() {
        let store = SessionStore::in_memory();
        store.persist(StorageTier::Durable, &sample_data()).unwrap();
        store.clear_all().unwrap();
        assert!(store.restore().unwrap().is_none());
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        storage.set(ACCESS_TOKEN_KEY, "a.b.c").unwrap();
        assert_eq!(
            storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
            Some("a.b.c")
        );
        storage.remove(ACCESS_TOKEN_KEY).unwrap();
        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        // Removing a missing key is not an error
        storage.remove(ACCESS_TOKEN_KEY).unwrap();
    }
}
