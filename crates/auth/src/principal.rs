use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Role;

/// The authenticated subject of a request.
///
/// Derived either from a successful credential check or from a validated
/// token; never persisted. `roles` are the roles held when the token was
/// issued, which can lag behind later administrator changes until the token
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(username: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// True iff the principal holds at least one of `required`.
    pub fn has_any_role(&self, required: &BTreeSet<Role>) -> bool {
        !self.roles.is_disjoint(required)
    }

    pub fn role_names(&self) -> Vec<&'static str> {
        self.roles.iter().map(Role::as_str).collect()
    }
}
