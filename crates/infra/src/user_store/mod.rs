//! Persistent [`UserStore`](taskdesk_auth::UserStore) implementations.

mod postgres;

pub use postgres::PostgresUserStore;

/// Users table. Uniqueness lives in named constraints so a violation can be
/// attributed to the right column; the CHECK keeps every row holding at
/// least one role.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    username      TEXT NOT NULL,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    enabled       BOOLEAN NOT NULL DEFAULT TRUE,
    roles         TEXT[] NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT users_username_key UNIQUE (username),
    CONSTRAINT users_email_key UNIQUE (email),
    CONSTRAINT users_roles_not_empty CHECK (cardinality(roles) > 0)
);
"#;
