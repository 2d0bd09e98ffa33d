//! `taskdesk-auth`: authentication and role-based access control.
//!
//! Credentials, bearer tokens and the authorization gate. Decoupled from
//! HTTP; storage sits behind [`UserStore`].

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod password;
pub mod principal;
pub mod roles;
pub mod store;
pub mod token;
pub mod user;

pub use authorize::{AccessPolicy, Decision, Operation, decide};
pub use claims::{TokenClaims, validate_claims};
pub use credentials::CredentialStore;
pub use error::{AuthError, FieldErrors};
pub use password::{Argon2Scheme, HashedPassword, PasswordError, PasswordHashers, PasswordScheme};
pub use principal::Principal;
pub use roles::{Role, RoleCatalog};
pub use store::InMemoryUserStore;
pub use token::{IssuedToken, SigningKey, TokenIssuer, TokenValidator};
pub use user::{Registration, StoreError, User, UserProfile, UserStore};
