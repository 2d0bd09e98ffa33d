use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use taskdesk_core::UserId;

use crate::{HashedPassword, Role, StoreError, User, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    by_username: HashMap<String, UserId>,
    by_email: HashMap<String, UserId>,
}

/// In-memory user store for tests/dev.
///
/// Uniqueness checks and the insert happen under one write lock, which is
/// what makes concurrent registrations of the same name resolve to a single
/// winner.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("user store lock poisoned".to_string())
    }

    fn update(&self, id: UserId, f: impl FnOnce(&mut User)) -> Result<User, StoreError> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        f(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;

        if tables.by_username.contains_key(&user.username) {
            return Err(StoreError::UsernameTaken);
        }
        if tables.by_email.contains_key(&user.email) {
            return Err(StoreError::EmailTaken);
        }

        tables.by_username.insert(user.username.clone(), user.id);
        tables.by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .by_username
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn set_roles(&self, id: UserId, roles: BTreeSet<Role>) -> Result<User, StoreError> {
        if roles.is_empty() {
            return Err(StoreError::Backend("refusing to store an empty role set".to_string()));
        }
        self.update(id, |u| u.roles = roles)
    }

    async fn set_enabled(&self, id: UserId, enabled: bool) -> Result<User, StoreError> {
        self.update(id, |u| u.enabled = enabled)
    }

    async fn set_password_hash(&self, id: UserId, hash: HashedPassword) -> Result<(), StoreError> {
        self.update(id, |u| u.password_hash = hash).map(|_| ())
    }
}
