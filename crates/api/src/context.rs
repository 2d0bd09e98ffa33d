use taskdesk_auth::{AuthError, Principal};

/// Principal context for a request.
///
/// Inserted by the auth middleware on every request that passes through it.
/// `None` means no bearer token, or one that failed validation; the gate
/// turns that into `401` for operations that need a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Option<Principal>,
}

impl PrincipalContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn require(&self) -> Result<&Principal, AuthError> {
        self.principal.as_ref().ok_or(AuthError::AuthenticationRequired)
    }
}
