use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthError, Principal, Role};

/// Bearer token claim set.
///
/// Times are Unix seconds (`iat`/`exp`), matching registered JWT claims.
/// `roles` deserializes into the closed [`Role`] enumeration, so a token
/// naming any other role fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the username.
    pub sub: String,

    /// Roles held by the subject when the token was issued.
    pub roles: BTreeSet<Role>,

    pub iat: i64,

    pub exp: i64,

    /// Unique token id.
    pub jti: Uuid,
}

impl TokenClaims {
    /// Fails with `Internal` when `now + ttl` leaves chrono's range.
    pub fn for_principal(
        principal: &Principal,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let expires = now.checked_add_signed(ttl).ok_or_else(|| {
            AuthError::internal(format!(
                "token ttl of {}s overflows the clock",
                ttl.num_seconds()
            ))
        })?;

        Ok(Self {
            sub: principal.username.clone(),
            roles: principal.roles.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::now_v7(),
        })
    }

    pub fn principal(&self) -> Principal {
        Principal {
            username: self.sub.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Deterministically validate already-verified claims against `now`.
///
/// - `exp <= iat`, an empty subject or an empty role set: `TokenMalformed`
/// - `now > exp + skew`: `TokenExpired`
pub fn validate_claims(
    claims: &TokenClaims,
    now: DateTime<Utc>,
    skew: Duration,
) -> Result<(), AuthError> {
    if claims.exp <= claims.iat || claims.sub.is_empty() || claims.roles.is_empty() {
        return Err(AuthError::TokenMalformed);
    }
    if now.timestamp() > claims.exp.saturating_add(skew.num_seconds()) {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>) -> TokenClaims {
        let principal = Principal::new("alice", [Role::Employee]);
        TokenClaims::for_principal(&principal, now, Duration::seconds(60)).unwrap()
    }

    #[test]
    fn valid_until_expiry_plus_skew() {
        let now = Utc::now();
        let claims = claims_at(now);
        let skew = Duration::seconds(5);

        assert_eq!(validate_claims(&claims, now, skew), Ok(()));
        assert_eq!(validate_claims(&claims, now + Duration::seconds(65), skew), Ok(()));
        assert_eq!(
            validate_claims(&claims, now + Duration::seconds(66), skew),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn inverted_time_window_is_malformed() {
        let now = Utc::now();
        let mut claims = claims_at(now);
        claims.exp = claims.iat;
        assert_eq!(validate_claims(&claims, now, Duration::zero()), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn empty_role_set_is_malformed() {
        let now = Utc::now();
        let mut claims = claims_at(now);
        claims.roles.clear();
        assert_eq!(validate_claims(&claims, now, Duration::zero()), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn ttl_past_the_end_of_the_clock_is_an_error() {
        let principal = Principal::new("alice", [Role::Employee]);
        let ttl = Duration::seconds(1_000_000_000_000_000);
        let result = TokenClaims::for_principal(&principal, Utc::now(), ttl);
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[test]
    fn roles_serialize_by_wire_name() {
        let claims = claims_at(Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "alice");
        assert_eq!(json["roles"], serde_json::json!(["EMPLOYEE"]));
    }
}
