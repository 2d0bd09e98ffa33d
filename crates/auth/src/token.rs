//! HS256 bearer tokens: issuance and validation.
//!
//! Both halves are pure functions of (claims, key, time). Nothing about an
//! issued token is stored server-side.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use crate::{AuthError, Principal, TokenClaims, validate_claims};

/// Shared HMAC secret, held for the life of the process.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: SigningKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let claims = TokenClaims::for_principal(principal, now, self.ttl)?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key.encoding)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, claims })
    }
}

#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: SigningKey,
    skew: Duration,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(key: SigningKey, skew: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self { key, skew, validation }
    }

    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Structure, then signature, then expiry. Claims are only read after
    /// the signature has verified.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        check_structure(token)?;
        let data = decode::<TokenClaims>(token, &self.key.decoding, &self.validation)
            .map_err(map_jwt_error)?;
        validate_claims(&data.claims, now, self.skew)?;
        Ok(data.claims.principal())
    }
}

/// Three base64url segments, the first two of them JSON objects.
fn check_structure(token: &str) -> Result<(), AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(AuthError::TokenMalformed);
    };

    for json in [header, payload] {
        let bytes = URL_SAFE_NO_PAD.decode(json).map_err(|_| AuthError::TokenMalformed)?;
        serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&bytes)
            .map_err(|_| AuthError::TokenMalformed)?;
    }
    URL_SAFE_NO_PAD.decode(signature).map_err(|_| AuthError::TokenMalformed)?;
    Ok(())
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            AuthError::TokenSignatureInvalid
        }
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenMalformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    const SECRET: &[u8] = b"test-secret-0123456789";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SigningKey::from_secret(SECRET), Duration::seconds(3600))
    }

    fn validator() -> TokenValidator {
        TokenValidator::new(SigningKey::from_secret(SECRET), Duration::seconds(30))
    }

    fn alice() -> Principal {
        Principal::new("alice", [Role::Employee])
    }

    fn sign_raw(header: Header, claims: &serde_json::Value) -> String {
        encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn issued_token_validates_to_same_principal() {
        let issued = issuer().issue(&alice()).unwrap();

        let principal = validator().validate(&issued.token).unwrap();
        assert_eq!(principal, alice());
        assert_eq!(issued.claims.exp - issued.claims.iat, 3600);
    }

    #[test]
    fn overflowing_ttl_fails_issuance_without_panicking() {
        let ttl = Duration::seconds(1_000_000_000_000_000);
        let issuer = TokenIssuer::new(SigningKey::from_secret(SECRET), ttl);
        assert!(matches!(issuer.issue(&alice()), Err(AuthError::Internal(_))));
    }

    #[test]
    fn each_token_gets_a_fresh_id() {
        let a = issuer().issue(&alice()).unwrap();
        let b = issuer().issue(&alice()).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn token_expires_after_ttl_plus_skew() {
        let now = Utc::now();
        let issued = issuer().issue_at(&alice(), now).unwrap();

        let just_inside = now + Duration::seconds(3600 + 30);
        let just_outside = now + Duration::seconds(3600 + 31);

        assert!(validator().validate_at(&issued.token, just_inside).is_ok());
        assert_eq!(
            validator().validate_at(&issued.token, just_outside),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn any_flipped_signature_bit_is_rejected() {
        let issued = issuer().issue(&alice()).unwrap();
        let (message, signature) = issued.token.rsplit_once('.').unwrap();
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for bit in 0..signature.len() * 8 {
            let mut tampered = signature.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let token = format!("{message}.{}", URL_SAFE_NO_PAD.encode(&tampered));

            assert_eq!(
                validator().validate(&token),
                Err(AuthError::TokenSignatureInvalid),
                "bit {bit} flipped"
            );
        }
    }

    #[test]
    fn tampered_claims_break_the_signature() {
        let issued = issuer().issue(&alice()).unwrap();
        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();

        let mut claims = issued.claims.clone();
        claims.roles.insert(Role::Admin);
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        assert_eq!(validator().validate(&parts.join(".")), Err(AuthError::TokenSignatureInvalid));
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "not-a-token", "a.b.c", "...."] {
            assert_eq!(validator().validate(token), Err(AuthError::TokenMalformed), "{token:?}");
        }
    }

    #[test]
    fn undecodable_segments_are_malformed() {
        let issued = issuer().issue(&alice()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();
        let (header, payload, signature) = (parts[0], parts[1], parts[2]);
        let not_json = URL_SAFE_NO_PAD.encode(b"not json");

        for token in [
            format!("{header}.!!!not-base64!!!.{signature}"),
            format!("{header}.!!!not-base64!!!.xyz"),
            format!("{header}.e30.xyz"),
            format!("{header}.{not_json}.{signature}"),
            format!("{header}.{payload}.***"),
            format!("{not_json}.{payload}.{signature}"),
            format!("{header}.{payload}"),
            format!("{header}.{payload}.{signature}.extra"),
        ] {
            assert_eq!(validator().validate(&token), Err(AuthError::TokenMalformed), "{token}");
        }
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenIssuer::new(
            SigningKey::from_secret(b"some-other-secret"),
            Duration::seconds(60),
        );
        let issued = other.issue(&alice()).unwrap();
        assert_eq!(validator().validate(&issued.token), Err(AuthError::TokenSignatureInvalid));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let claims =
            TokenClaims::for_principal(&alice(), Utc::now(), Duration::seconds(60)).unwrap();
        let claims = serde_json::to_value(claims).unwrap();
        let token = sign_raw(Header::new(Algorithm::HS384), &claims);
        assert_eq!(validator().validate(&token), Err(AuthError::TokenSignatureInvalid));
    }

    #[test]
    fn unsigned_alg_none_token_is_rejected() {
        let claims =
            TokenClaims::for_principal(&alice(), Utc::now(), Duration::seconds(60)).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let result = validator().validate(&format!("{header}.{payload}."));
        assert_eq!(result, Err(AuthError::TokenMalformed));
    }

    #[test]
    fn signed_token_with_unknown_role_is_malformed() {
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "mallory",
            "roles": ["SUPERUSER"],
            "iat": now,
            "exp": now + 60,
            "jti": uuid::Uuid::now_v7(),
        });
        let token = sign_raw(Header::new(Algorithm::HS256), &claims);
        assert_eq!(validator().validate(&token), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn signed_token_missing_expiry_is_malformed() {
        let claims = serde_json::json!({ "sub": "alice", "roles": ["EMPLOYEE"], "iat": 0 });
        let token = sign_raw(Header::new(Algorithm::HS256), &claims);
        assert_eq!(validator().validate(&token), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn debug_hides_the_secret() {
        let printed = format!("{:?}", issuer());
        assert!(!printed.contains("test-secret"));
    }
}
