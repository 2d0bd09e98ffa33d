use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::{AuthError, Principal, Role, RoleCatalog};

/// Every operation the HTTP surface gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    ViewProfile,
    ListProjects,
    GetProject,
    CreateProject,
    AddProjectMember,
    ListTasks,
    CreateTask,
    UpdateTaskStatus,
    ListUsers,
    ManageUsers,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::ViewProfile,
        Operation::ListProjects,
        Operation::GetProject,
        Operation::CreateProject,
        Operation::AddProjectMember,
        Operation::ListTasks,
        Operation::CreateTask,
        Operation::UpdateTaskStatus,
        Operation::ListUsers,
        Operation::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ViewProfile => "view_profile",
            Operation::ListProjects => "list_projects",
            Operation::GetProject => "get_project",
            Operation::CreateProject => "create_project",
            Operation::AddProjectMember => "add_project_member",
            Operation::ListTasks => "list_tasks",
            Operation::CreateTask => "create_task",
            Operation::UpdateTaskStatus => "update_task_status",
            Operation::ListUsers => "list_users",
            Operation::ManageUsers => "manage_users",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No (valid) principal on the request.
    AuthenticationRequired,
    /// Authenticated, but none of the required roles.
    AccessDenied,
}

impl Decision {
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::AuthenticationRequired => Err(AuthError::AuthenticationRequired),
            Decision::AccessDenied => Err(AuthError::AccessDenied),
        }
    }
}

/// Pure role check: allow iff the principal holds at least one required role.
///
/// - No IO
/// - No panics
pub fn decide(required: &BTreeSet<Role>, principal: Option<&Principal>) -> Decision {
    match principal {
        None => Decision::AuthenticationRequired,
        Some(p) if p.has_any_role(required) => Decision::Allow,
        Some(_) => Decision::AccessDenied,
    }
}

/// Static operation → required-roles table, fixed at startup.
///
/// An operation missing from the table requires the empty set, which no
/// principal can satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    table: BTreeMap<Operation, BTreeSet<Role>>,
}

impl AccessPolicy {
    /// The service's standard table. "Any authenticated" operations require
    /// any role the catalog provisions.
    pub fn standard(catalog: &RoleCatalog) -> Result<Self, AuthError> {
        let any: Vec<Role> = catalog.roles().collect();
        let elevated = vec![Role::Manager, Role::Admin];
        let admin = vec![Role::Admin];

        Self::from_table(
            catalog,
            Operation::ALL.into_iter().map(|op| {
                let roles = match op {
                    Operation::ViewProfile
                    | Operation::ListProjects
                    | Operation::GetProject
                    | Operation::ListTasks
                    | Operation::UpdateTaskStatus => any.clone(),
                    Operation::CreateProject
                    | Operation::AddProjectMember
                    | Operation::CreateTask => elevated.clone(),
                    Operation::ListUsers | Operation::ManageUsers => admin.clone(),
                };
                (op, roles)
            }),
        )
    }

    /// Build a table, rejecting any role the catalog does not provision.
    pub fn from_table<R>(
        catalog: &RoleCatalog,
        entries: impl IntoIterator<Item = (Operation, R)>,
    ) -> Result<Self, AuthError>
    where
        R: IntoIterator<Item = Role>,
    {
        let mut table = BTreeMap::new();
        for (op, roles) in entries {
            let roles: BTreeSet<Role> = roles.into_iter().collect();
            if let Some(missing) = roles.iter().find(|r| !catalog.contains(**r)) {
                return Err(AuthError::RoleNotConfigured(missing.as_str().to_string()));
            }
            table.insert(op, roles);
        }
        Ok(Self { table })
    }

    pub fn required(&self, op: Operation) -> BTreeSet<Role> {
        self.table.get(&op).cloned().unwrap_or_default()
    }

    /// Gate `op` for `principal`, logging denials.
    pub fn authorize(&self, op: Operation, principal: Option<&Principal>) -> Result<(), AuthError> {
        let decision = decide(&self.required(op), principal);

        match (decision, principal) {
            (Decision::Allow, Some(p)) => {
                debug!(operation = %op, user = %p.username, "access granted")
            }
            (Decision::AccessDenied, Some(p)) => warn!(
                operation = %op,
                user = %p.username,
                roles = ?p.role_names(),
                "access denied: insufficient role"
            ),
            (Decision::AuthenticationRequired, _) => {
                debug!(operation = %op, "access denied: not authenticated")
            }
            _ => {}
        }

        decision.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn employee() -> Principal {
        Principal::new("erin", [Role::Employee])
    }

    #[test]
    fn employee_is_denied_elevated_and_allowed_open_sets() {
        let elevated = BTreeSet::from([Role::Manager, Role::Admin]);
        let open = BTreeSet::from(Role::ALL);

        assert_eq!(decide(&elevated, Some(&employee())), Decision::AccessDenied);
        assert_eq!(decide(&open, Some(&employee())), Decision::Allow);
    }

    #[test]
    fn missing_principal_is_unauthenticated_not_forbidden() {
        let open = BTreeSet::from(Role::ALL);
        assert_eq!(decide(&open, None), Decision::AuthenticationRequired);
        assert_eq!(
            Decision::AuthenticationRequired.into_result(),
            Err(AuthError::AuthenticationRequired)
        );
        assert_eq!(Decision::AccessDenied.into_result(), Err(AuthError::AccessDenied));
    }

    #[test]
    fn standard_policy_table() {
        let policy = AccessPolicy::standard(&RoleCatalog::seeded()).unwrap();
        let manager = Principal::new("mo", [Role::Manager]);
        let admin = Principal::new("ada", [Role::Admin]);

        assert!(policy.authorize(Operation::ListProjects, Some(&employee())).is_ok());
        assert!(policy.authorize(Operation::UpdateTaskStatus, Some(&employee())).is_ok());
        assert_eq!(
            policy.authorize(Operation::CreateProject, Some(&employee())),
            Err(AuthError::AccessDenied)
        );
        assert!(policy.authorize(Operation::CreateProject, Some(&manager)).is_ok());
        assert_eq!(
            policy.authorize(Operation::ListUsers, Some(&manager)),
            Err(AuthError::AccessDenied)
        );
        assert!(policy.authorize(Operation::ManageUsers, Some(&admin)).is_ok());
        assert_eq!(
            policy.authorize(Operation::ViewProfile, None),
            Err(AuthError::AuthenticationRequired)
        );
    }

    #[test]
    fn policy_requiring_unprovisioned_role_fails_at_construction() {
        let catalog = RoleCatalog::new([Role::Admin, Role::Employee], "EMPLOYEE").unwrap();
        assert_eq!(
            AccessPolicy::standard(&catalog),
            Err(AuthError::RoleNotConfigured("MANAGER".to_string()))
        );
    }

    #[test]
    fn operation_absent_from_table_denies_everyone() {
        let catalog = RoleCatalog::seeded();
        let policy =
            AccessPolicy::from_table(&catalog, [(Operation::ListTasks, vec![Role::Employee])])
                .unwrap();
        let admin = Principal::new("ada", Role::ALL);

        assert!(policy.authorize(Operation::ListTasks, Some(&employee())).is_ok());
        assert_eq!(
            policy.authorize(Operation::ListUsers, Some(&admin)),
            Err(AuthError::AccessDenied)
        );
    }

    fn role_set() -> impl Strategy<Value = BTreeSet<Role>> {
        proptest::sample::subsequence(Role::ALL.to_vec(), 0..=Role::ALL.len())
            .prop_map(|roles| roles.into_iter().collect())
    }

    proptest! {
        #[test]
        fn allow_iff_roles_intersect(held in role_set(), required in role_set()) {
            let principal = Principal::new("p", held.clone());
            let expected = if held.intersection(&required).next().is_some() {
                Decision::Allow
            } else {
                Decision::AccessDenied
            };
            prop_assert_eq!(decide(&required, Some(&principal)), expected);
        }

        #[test]
        fn no_principal_never_allowed(required in role_set()) {
            prop_assert_eq!(decide(&required, None), Decision::AuthenticationRequired);
        }
    }
}
