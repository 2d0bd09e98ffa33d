//! Registration, credential verification and administrator account actions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use validator::Validate;

use taskdesk_core::UserId;

use crate::{
    AuthError, HashedPassword, PasswordHashers, Principal, Registration, Role, RoleCatalog,
    StoreError, User, UserProfile, UserStore,
};

// Hashed once at construction and verified against when the username is
// unknown, so both failure paths cost one hash verification.
const DUMMY_PASSWORD: &str = "taskdesk-dummy-password";

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => AuthError::DuplicateUsername,
            StoreError::EmailTaken => AuthError::DuplicateEmail,
            StoreError::NotFound => AuthError::UserNotFound,
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    hashers: PasswordHashers,
    catalog: RoleCatalog,
    dummy_hash: HashedPassword,
}

impl CredentialStore {
    pub fn new(
        users: Arc<dyn UserStore>,
        hashers: PasswordHashers,
        catalog: RoleCatalog,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hashers
            .hash(DUMMY_PASSWORD)
            .map_err(|e| AuthError::internal(e.to_string()))?;

        Ok(Self {
            users,
            hashers,
            catalog,
            dummy_hash,
        })
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Self-service registration with the catalog's default role.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let roles = BTreeSet::from([self.catalog.default_role()]);
        self.create(registration, roles).await
    }

    /// Create an account with an explicit role set (startup seeding).
    pub async fn provision(
        &self,
        registration: Registration,
        roles: BTreeSet<Role>,
    ) -> Result<User, AuthError> {
        if roles.is_empty() {
            return Err(AuthError::field("roles", "At least one role is required"));
        }
        if let Some(role) = roles.iter().find(|r| !self.catalog.contains(**r)) {
            return Err(AuthError::RoleNotConfigured(role.as_str().to_string()));
        }
        self.create(registration, roles).await
    }

    async fn create(
        &self,
        registration: Registration,
        roles: BTreeSet<Role>,
    ) -> Result<User, AuthError> {
        let registration = registration.normalized();
        registration
            .validate()
            .map_err(|e| AuthError::Validation(e.into()))?;

        let password_hash = self.hash_password(registration.password).await?;
        let user = User {
            id: UserId::new(),
            username: registration.username,
            email: registration.email,
            password_hash,
            enabled: true,
            roles,
            created_at: Utc::now(),
        };

        match self.users.insert(user).await {
            Ok(user) => {
                info!(
                    user_id = %user.id,
                    username = %user.username,
                    roles = ?user.roles,
                    "user registered"
                );
                Ok(user)
            }
            Err(StoreError::Backend(msg)) => {
                error!(error = %msg, "user insert failed");
                Err(AuthError::Internal(msg))
            }
            Err(err) => {
                warn!(reason = %err, "registration rejected");
                Err(err.into())
            }
        }
    }

    /// Check a username/password pair.
    ///
    /// Unknown user, disabled account and wrong password all yield the same
    /// `InvalidCredentials`. A hash made by a retired scheme is replaced with
    /// one from the current scheme once the password has matched.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let username = username.trim();

        let Some(user) = self.users.find_by_username(username).await? else {
            self.verify_password(password, self.dummy_hash.clone()).await?;
            warn!(username = %username, "login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, user.password_hash.clone()).await? {
            warn!(username = %username, "login failed: bad password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.enabled {
            warn!(username = %username, "login failed: account disabled");
            return Err(AuthError::InvalidCredentials);
        }

        if self.hashers.needs_rehash(&user.password_hash) {
            self.upgrade_hash(&user, password).await;
        }

        info!(username = %username, "login succeeded");
        Ok(Principal::new(user.username, user.roles))
    }

    async fn upgrade_hash(&self, user: &User, password: &str) {
        let upgraded = match self.hash_password(password.to_string()).await {
            Ok(hash) => hash,
            Err(err) => {
                error!(user_id = %user.id, error = %err, "password rehash failed");
                return;
            }
        };

        match self.users.set_password_hash(user.id, upgraded).await {
            Ok(()) => info!(
                user_id = %user.id,
                from = user.password_hash.algorithm().unwrap_or("unknown"),
                to = self.hashers.current_algorithm(),
                "password hash upgraded"
            ),
            Err(err) => error!(
                user_id = %user.id,
                error = %err,
                "storing upgraded password hash failed"
            ),
        }
    }

    pub async fn profile(&self, username: &str) -> Result<UserProfile, AuthError> {
        self.users
            .find_by_username(username)
            .await?
            .map(|u| u.profile())
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn profile_by_id(&self, id: UserId) -> Result<UserProfile, AuthError> {
        self.users
            .find_by_id(id)
            .await?
            .map(|u| u.profile())
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, AuthError> {
        Ok(self.users.list().await?.iter().map(User::profile).collect())
    }

    /// Replace a user's role set. Names resolve against the catalog; an
    /// empty list is rejected since every user keeps at least one role.
    pub async fn assign_roles<S: AsRef<str>>(
        &self,
        id: UserId,
        names: &[S],
    ) -> Result<UserProfile, AuthError> {
        let roles = self.catalog.resolve("roles", names)?;
        let user = self.users.set_roles(id, roles).await?;
        info!(user_id = %id, roles = ?user.roles, "roles updated");
        Ok(user.profile())
    }

    pub async fn set_enabled(&self, id: UserId, enabled: bool) -> Result<UserProfile, AuthError> {
        let user = self.users.set_enabled(id, enabled).await?;
        info!(user_id = %id, enabled, "account status updated");
        Ok(user.profile())
    }

    async fn hash_password(&self, raw: String) -> Result<HashedPassword, AuthError> {
        let hashers = self.hashers.clone();
        tokio::task::spawn_blocking(move || hashers.hash(&raw))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AuthError::internal(e.to_string()))
    }

    /// An unusable stored hash counts as a mismatch; it is logged, never
    /// surfaced to the caller.
    async fn verify_password(&self, raw: &str, stored: HashedPassword) -> Result<bool, AuthError> {
        let hashers = self.hashers.clone();
        let raw = raw.to_string();
        let outcome = tokio::task::spawn_blocking(move || hashers.verify(&raw, &stored))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {e}")))?;

        Ok(outcome.unwrap_or_else(|err| {
            error!(error = %err, "stored password hash is unusable");
            false
        }))
    }
}

impl core::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("hashers", &self.hashers)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
