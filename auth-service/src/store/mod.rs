//! Credential Store seam.
//!
//! The store is an external collaborator: the authenticator only ever
//! looks records up by username or id and touches the advisory
//! `last_active` stamp. Everything else (user CRUD, admin flows) lives
//! outside this service.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::utils::{hash_password, Password};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-sensitive exact lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, anyhow::Error>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error>;

    /// Advisory stamp consumed by the out-of-process cleanup job.
    async fn touch_last_active(&self, user_id: Uuid) -> Result<(), anyhow::Error>;
}

/// In-memory credential store.
///
/// The production deployment plugs a database-backed implementation into
/// the same trait; this one backs the dev binary (seeded from JSON) and
/// the test suites.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<Uuid, User>,
    by_username: DashMap<String, Uuid>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.by_username.insert(user.username.clone(), user.user_id);
        self.users.insert(user.user_id, user);
    }

    pub fn remove(&self, user_id: Uuid) {
        if let Some((_, user)) = self.users.remove(&user_id) {
            self.by_username.remove(&user.username);
        }
    }

    /// Mutate a record in place (test and seed tooling).
    pub fn update<F: FnOnce(&mut User)>(&self, user_id: Uuid, f: F) {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            f(&mut user);
            user.updated_at = Utc::now();
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Load seed accounts from a JSON file, hashing plaintext passwords
    /// at load time.
    pub fn from_seed_file(path: &Path) -> Result<Self, anyhow::Error> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read seed file {}: {}", path.display(), e))?;
        let seeds: Vec<SeedUser> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse seed file {}: {}", path.display(), e))?;

        let store = Self::new();
        for seed in seeds {
            let password_hash = hash_password(&Password::new(seed.password))?;
            let mut user = User::new(
                seed.username,
                seed.email,
                password_hash.into_string(),
                seed.user_role,
                seed.first_name,
                seed.last_name,
            );
            user.is_active = seed.is_active.unwrap_or(true);
            user.is_deleted = seed.is_deleted.unwrap_or(false);
            store.insert(user);
        }

        tracing::info!(count = store.len(), "Seed users loaded");
        Ok(store)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, anyhow::Error> {
        let id = match self.by_username.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn touch_last_active(&self, user_id: Uuid) -> Result<(), anyhow::Error> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.last_active = Some(Utc::now());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    username: String,
    email: String,
    password: String,
    user_role: Role,
    first_name: String,
    last_name: String,
    is_active: Option<bool>,
    is_deleted: Option<bool>,
}
