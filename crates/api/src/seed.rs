//! Startup provisioning of the administrator account.

use std::collections::BTreeSet;

use tracing::{info, warn};

use taskdesk_auth::{AuthError, CredentialStore, Registration, Role};

use crate::config::SeedAdmin;

/// Outcome of a seeding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
    Skipped,
}

/// Ensure the configured administrator exists.
///
/// An account that already holds the username is left untouched, so
/// restarts against a persistent store are harmless.
pub async fn seed_admin(
    credentials: &CredentialStore,
    admin: Option<&SeedAdmin>,
) -> Result<SeedOutcome, AuthError> {
    let Some(admin) = admin else {
        info!("SEED_ADMIN_PASSWORD not set; skipping admin seeding");
        return Ok(SeedOutcome::Skipped);
    };

    let registration = Registration::new(&admin.username, &admin.email, &admin.password);
    match credentials.provision(registration, BTreeSet::from([Role::Admin])).await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "admin account seeded");
            Ok(SeedOutcome::Created)
        }
        Err(AuthError::DuplicateUsername) => {
            info!(username = %admin.username, "admin account already present");
            Ok(SeedOutcome::AlreadyPresent)
        }
        Err(err) => {
            warn!(username = %admin.username, error = %err, "admin seeding failed");
            Err(err)
        }
    }
}
