//! Password hashing schemes.
//!
//! Every stored hash is a PHC string (`$argon2id$v=19$...`), so the
//! algorithm tag travels with the hash. Verification picks the scheme by
//! that tag; new hashes always use the current scheme, which lets the
//! algorithm change without invalidating stored credentials.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),

    #[error("malformed password hash")]
    InvalidHashFormat,

    #[error("no password scheme registered for '{0}'")]
    UnsupportedScheme(String),
}

/// An algorithm-tagged password hash. Opaque outside this module.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }

    /// Algorithm tag of the PHC string (`argon2id`, `argon2i`, ...).
    pub fn algorithm(&self) -> Option<&str> {
        self.0.strip_prefix('$')?.split('$').next().filter(|s| !s.is_empty())
    }
}

impl core::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HashedPassword({})", self.algorithm().unwrap_or("?"))
    }
}

/// A salted, slow, one-way password hashing capability.
pub trait PasswordScheme: Send + Sync {
    /// The PHC algorithm identifier this scheme produces and verifies.
    fn algorithm(&self) -> &'static str;

    fn hash(&self, raw: &str) -> Result<HashedPassword, PasswordError>;

    /// Constant-time check of `raw` against `stored`.
    ///
    /// `Ok(false)` is a mismatch; `Err` means the stored hash is unusable.
    fn verify(&self, raw: &str, stored: &HashedPassword) -> Result<bool, PasswordError>;
}

/// Argon2 in one of its variants, with explicit cost parameters.
#[derive(Debug, Clone)]
pub struct Argon2Scheme {
    algorithm: Algorithm,
    params: Params,
}

impl Argon2Scheme {
    /// Argon2id with the crate's recommended default costs.
    pub fn argon2id() -> Self {
        Self {
            algorithm: Algorithm::Argon2id,
            params: Params::default(),
        }
    }

    pub fn new(
        algorithm: Algorithm,
        memory_kib: u32,
        iterations: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Self { algorithm, params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(self.algorithm, Version::V0x13, self.params.clone())
    }
}

impl PasswordScheme for Argon2Scheme {
    fn algorithm(&self) -> &'static str {
        self.algorithm.as_str()
    }

    fn hash(&self, raw: &str) -> Result<HashedPassword, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(HashedPassword(hash.to_string()))
    }

    fn verify(&self, raw: &str, stored: &HashedPassword) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(stored.as_phc()).map_err(|_| PasswordError::InvalidHashFormat)?;

        // Cost parameters come from the stored hash, so older hashes made with
        // different costs still verify.
        match self.hasher().verify_password(raw.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::InvalidHashFormat),
        }
    }
}

/// Registry of password schemes: one current, any number still accepted.
#[derive(Clone)]
pub struct PasswordHashers {
    current: Arc<dyn PasswordScheme>,
    accepted: Vec<Arc<dyn PasswordScheme>>,
}

impl PasswordHashers {
    pub fn new(current: impl PasswordScheme + 'static) -> Self {
        Self {
            current: Arc::new(current),
            accepted: Vec::new(),
        }
    }

    /// Argon2id at the given costs, still accepting Argon2i hashes from
    /// earlier deployments.
    pub fn argon2(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        Ok(Self::new(Argon2Scheme::new(Algorithm::Argon2id, memory_kib, iterations)?)
            .accepting(Argon2Scheme::new(Algorithm::Argon2i, memory_kib, iterations)?))
    }

    /// Keep verifying hashes produced by a retired scheme.
    pub fn accepting(mut self, legacy: impl PasswordScheme + 'static) -> Self {
        self.accepted.push(Arc::new(legacy));
        self
    }

    pub fn current_algorithm(&self) -> &'static str {
        self.current.algorithm()
    }

    pub fn hash(&self, raw: &str) -> Result<HashedPassword, PasswordError> {
        self.current.hash(raw)
    }

    pub fn verify(&self, raw: &str, stored: &HashedPassword) -> Result<bool, PasswordError> {
        let tag = stored.algorithm().ok_or(PasswordError::InvalidHashFormat)?;
        let scheme = std::iter::once(&self.current)
            .chain(self.accepted.iter())
            .find(|s| s.algorithm() == tag)
            .ok_or_else(|| PasswordError::UnsupportedScheme(tag.to_string()))?;
        scheme.verify(raw, stored)
    }

    /// True when `stored` was not produced by the current scheme.
    pub fn needs_rehash(&self, stored: &HashedPassword) -> bool {
        stored.algorithm() != Some(self.current.algorithm())
    }
}

impl Default for PasswordHashers {
    fn default() -> Self {
        Self::new(Argon2Scheme::argon2id())
    }
}

impl core::fmt::Debug for PasswordHashers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHashers")
            .field("current", &self.current.algorithm())
            .field("accepted", &self.accepted.iter().map(|s| s.algorithm()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn fast_scheme(algorithm: Algorithm) -> Argon2Scheme {
    Argon2Scheme::new(algorithm, 8, 1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_password() {
        let scheme = fast_scheme(Algorithm::Argon2id);
        let hash = scheme.hash("TestPassword123!").unwrap();

        assert!(hash.as_phc().starts_with("$argon2id$"));
        assert!(scheme.verify("TestPassword123!", &hash).unwrap());
        assert!(!scheme.verify("WrongPassword123!", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let scheme = fast_scheme(Algorithm::Argon2id);
        let a = scheme.hash("Password1").unwrap();
        let b = scheme.hash("Password1").unwrap();

        assert_ne!(a, b);
        assert!(scheme.verify("Password1", &a).unwrap());
        assert!(scheme.verify("Password1", &b).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let scheme = fast_scheme(Algorithm::Argon2id);
        let result = scheme.verify("password", &HashedPassword::from_phc("not-a-valid-hash"));
        assert_eq!(result, Err(PasswordError::InvalidHashFormat));
    }

    #[test]
    fn algorithm_tag_is_read_from_phc_string() {
        let hash = HashedPassword::from_phc("$argon2i$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA");
        assert_eq!(hash.algorithm(), Some("argon2i"));
        assert_eq!(HashedPassword::from_phc("plain").algorithm(), None);
    }

    #[test]
    fn debug_never_prints_the_hash() {
        let hash = fast_scheme(Algorithm::Argon2id).hash("secret").unwrap();
        assert_eq!(format!("{hash:?}"), "HashedPassword(argon2id)");
    }

    #[test]
    fn registry_verifies_legacy_scheme_and_flags_rehash() {
        let legacy = fast_scheme(Algorithm::Argon2i);
        let old_hash = legacy.hash("pw123").unwrap();

        let hashers = PasswordHashers::new(fast_scheme(Algorithm::Argon2id))
            .accepting(fast_scheme(Algorithm::Argon2i));

        assert!(hashers.verify("pw123", &old_hash).unwrap());
        assert!(hashers.needs_rehash(&old_hash));

        let new_hash = hashers.hash("pw123").unwrap();
        assert!(!hashers.needs_rehash(&new_hash));
    }

    #[test]
    fn argon2_registry_hashes_id_and_accepts_i() {
        let hashers = PasswordHashers::argon2(8, 1).unwrap();
        assert_eq!(hashers.current_algorithm(), "argon2id");

        let legacy = fast_scheme(Algorithm::Argon2i).hash("pw123").unwrap();
        assert!(hashers.verify("pw123", &legacy).unwrap());
    }

    #[test]
    fn argon2_registry_rejects_invalid_costs() {
        assert!(matches!(PasswordHashers::argon2(0, 0), Err(PasswordError::HashingFailed(_))));
    }

    #[test]
    fn registry_rejects_unknown_scheme() {
        let hashers = PasswordHashers::new(fast_scheme(Algorithm::Argon2id));
        let old_hash = fast_scheme(Algorithm::Argon2i).hash("pw123").unwrap();

        assert_eq!(
            hashers.verify("pw123", &old_hash),
            Err(PasswordError::UnsupportedScheme("argon2i".to_string()))
        );
    }
}
