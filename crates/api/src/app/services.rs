//! Service wiring: user store selection, credential store, tokens, policy
//! and the project board.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use taskdesk_auth::{
    AccessPolicy, AuthError, CredentialStore, InMemoryUserStore, PasswordError, PasswordHashers,
    Role, RoleCatalog, SigningKey, StoreError, TokenIssuer, TokenValidator, UserStore,
};
use taskdesk_infra::{DbError, PostgresUserStore};

use crate::app::board::Board;
use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("user store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

/// Everything handlers need, shared behind one `Arc`.
#[derive(Debug)]
pub struct AppServices {
    pub credentials: CredentialStore,
    pub issuer: TokenIssuer,
    pub validator: Arc<TokenValidator>,
    pub policy: AccessPolicy,
    pub board: Board,
}

/// Build services, choosing the user store from configuration.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, BootstrapError> {
    let users: Arc<dyn UserStore> = if config.use_persistent_stores {
        let url = config.database_url.as_deref().ok_or(BootstrapError::MissingDatabaseUrl)?;
        let pool = taskdesk_infra::connect(url, config.database_max_connections).await?;
        let store = PostgresUserStore::new(pool);
        store.ensure_schema().await?;
        info!("using postgres user store");
        Arc::new(store)
    } else {
        info!("using in-memory user store");
        Arc::new(InMemoryUserStore::new())
    };

    build_services_with(config, users)
}

/// Build services over an already constructed user store.
pub fn build_services_with(
    config: &AppConfig,
    users: Arc<dyn UserStore>,
) -> Result<AppServices, BootstrapError> {
    // A misconfigured default role or policy fails here, before serving.
    let catalog = RoleCatalog::new(Role::ALL, &config.default_role)?;
    let policy = AccessPolicy::standard(&catalog)?;

    let hashers = PasswordHashers::argon2(config.argon2_memory_kib, config.argon2_iterations)?;
    let credentials = CredentialStore::new(users, hashers, catalog)?;

    let key = SigningKey::from_secret(config.jwt_secret.as_bytes());
    let issuer = TokenIssuer::new(key.clone(), config.token_ttl);
    let validator = Arc::new(TokenValidator::new(key, config.clock_skew));

    info!(
        default_role = %credentials.catalog().default_role(),
        token_ttl_secs = config.token_ttl.num_seconds(),
        "auth services ready"
    );

    Ok(AppServices {
        credentials,
        issuer,
        validator,
        policy,
        board: Board::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> AppConfig {
        AppConfig {
            argon2_memory_kib: 8,
            argon2_iterations: 1,
            ..AppConfig::default()
        }
    }

    #[test]
    fn unknown_default_role_fails_bootstrap() {
        let config = AppConfig {
            default_role: "INTERN".to_string(),
            ..fast_config()
        };
        let err = build_services_with(&config, Arc::new(InMemoryUserStore::new())).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Auth(AuthError::RoleNotConfigured(ref r)) if r == "INTERN"
        ));
    }

    #[test]
    fn default_role_accepts_legacy_spelling() {
        let config = AppConfig {
            default_role: "ROLE_MANAGER".to_string(),
            ..fast_config()
        };
        let services = build_services_with(&config, Arc::new(InMemoryUserStore::new())).unwrap();
        assert_eq!(services.credentials.catalog().default_role(), Role::Manager);
    }

    #[tokio::test]
    async fn in_memory_services_build_without_a_database() {
        let services = build_services(&fast_config()).await.unwrap();
        assert!(services.credentials.list_profiles().await.unwrap().is_empty());
    }
}
