use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Role identifier used for RBAC.
///
/// Closed set: a role name outside this enumeration never deserializes, so a
/// token or stored record carrying one is rejected rather than trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Lenient parse for operator/config input.
    ///
    /// Accepts any letter case and the legacy `ROLE_` prefix
    /// (`"role_admin"` → `Admin`).
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles provisioned for this process plus the role given to new accounts.
///
/// Built once at startup; a default role that is not provisioned is a
/// configuration error, never a per-request one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    provisioned: BTreeSet<Role>,
    default_role: Role,
}

impl RoleCatalog {
    /// Every role provisioned, `EMPLOYEE` as the registration default.
    pub fn seeded() -> Self {
        Self {
            provisioned: Role::ALL.into_iter().collect(),
            default_role: Role::Employee,
        }
    }

    pub fn new(
        provisioned: impl IntoIterator<Item = Role>,
        default_role_name: &str,
    ) -> Result<Self, AuthError> {
        let provisioned: BTreeSet<Role> = provisioned.into_iter().collect();
        let default_role = Role::parse(default_role_name)
            .filter(|r| provisioned.contains(r))
            .ok_or_else(|| AuthError::RoleNotConfigured(default_role_name.to_string()))?;

        Ok(Self {
            provisioned,
            default_role,
        })
    }

    pub fn default_role(&self) -> Role {
        self.default_role
    }

    pub fn contains(&self, role: Role) -> bool {
        self.provisioned.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.provisioned.iter().copied()
    }

    /// Resolve operator-supplied role names against the catalog.
    ///
    /// Unknown or unprovisioned names and an empty list are field errors on
    /// `field`, since every user must hold at least one role.
    pub fn resolve<S: AsRef<str>>(
        &self,
        field: &str,
        names: &[S],
    ) -> Result<BTreeSet<Role>, AuthError> {
        if names.is_empty() {
            return Err(AuthError::field(field, "At least one role is required"));
        }

        names
            .iter()
            .map(|name| {
                Role::parse(name.as_ref())
                    .filter(|r| self.contains(*r))
                    .ok_or_else(|| {
                        AuthError::field(field, format!("Unknown role '{}'", name.as_ref()))
                    })
            })
            .collect()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}
