//! Postgres-backed user store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation on `users_username_key`) | `23505` | `UsernameTaken` |
//! | Database (unique violation on `users_email_key`) | `23505` | `EmailTaken` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Other | N/A | `Backend` |

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use taskdesk_auth::{HashedPassword, Role, StoreError, User, UserStore};
use taskdesk_core::UserId;

use super::SCHEMA;

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

const USER_COLUMNS: &str = "id, username, email, password_hash, enabled, roles, created_at";

/// User store on a shared connection pool.
///
/// Uniqueness is enforced by the table's `UNIQUE` constraints, so racing
/// inserts of the same username resolve inside Postgres to one winner.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create the users table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        operation: &str,
        clause: &str,
        bind: UserLookup<'_>,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let query = sqlx::query(&sql);
        let query = match bind {
            UserLookup::Id(id) => query.bind(*id.as_uuid()),
            UserLookup::Username(username) => query.bind(username),
        };

        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.map(|row| decode_row(&row)).transpose()
    }

    /// Run an `UPDATE ... RETURNING` for one user; no row means not found.
    async fn update_returning<'q>(
        &self,
        operation: &str,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<User, StoreError> {
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?
            .ok_or(StoreError::NotFound)?;
        decode_row(&row)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("username_exists", e))?;
        Ok(row.is_some())
    }
}

enum UserLookup<'a> {
    Id(UserId),
    Username(&'a str),
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username), err)]
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let roles: Vec<String> = user.roles.iter().map(|r| r.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, enabled, roles, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.password_hash.as_phc())
        .bind(user.enabled)
        .bind(&roles)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await;

        match result.map_err(|e| map_sqlx_error("insert", e)) {
            Ok(_) => Ok(user),
            // Postgres reports whichever index it checked first; a username
            // collision takes precedence.
            Err(StoreError::EmailTaken) => {
                if self.username_exists(&user.username).await? {
                    Err(StoreError::UsernameTaken)
                } else {
                    Err(StoreError::EmailTaken)
                }
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.fetch_one_where("find_by_username", "username = $1", UserLookup::Username(username))
            .await
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_one_where("find_by_id", "id = $1", UserLookup::Id(id)).await
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_roles(&self, id: UserId, roles: BTreeSet<Role>) -> Result<User, StoreError> {
        if roles.is_empty() {
            return Err(StoreError::Backend("refusing to store an empty role set".to_string()));
        }
        let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let sql = format!("UPDATE users SET roles = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        self.update_returning("set_roles", sqlx::query(&sql).bind(*id.as_uuid()).bind(roles))
            .await
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_enabled(&self, id: UserId, enabled: bool) -> Result<User, StoreError> {
        let sql = format!("UPDATE users SET enabled = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        self.update_returning("set_enabled", sqlx::query(&sql).bind(*id.as_uuid()).bind(enabled))
            .await
    }

    #[instrument(skip(self, hash), fields(user_id = %id), err)]
    async fn set_password_hash(&self, id: UserId, hash: HashedPassword) -> Result<(), StoreError> {
        let sql =
            format!("UPDATE users SET password_hash = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        self.update_returning(
            "set_password_hash",
            sqlx::query(&sql).bind(*id.as_uuid()).bind(hash.as_phc().to_string()),
        )
        .await
        .map(|_| ())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    email: String,
    password_hash: String,
    enabled: bool,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            enabled: row.try_get("enabled")?,
            roles: row.try_get("roles")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl UserRow {
    /// A stored role name outside the enumeration is a corrupt row, not a
    /// role to silently drop.
    fn into_user(self) -> Result<User, StoreError> {
        let roles = self
            .roles
            .iter()
            .map(|name| {
                Role::parse(name).ok_or_else(|| {
                    StoreError::Backend(format!("user {} has unknown role '{}'", self.id, name))
                })
            })
            .collect::<Result<BTreeSet<Role>, _>>()?;

        if roles.is_empty() {
            return Err(StoreError::Backend(format!("user {} has no roles", self.id)));
        }

        Ok(User {
            id: UserId::from_uuid(self.id),
            username: self.username,
            email: self.email,
            password_hash: HashedPassword::from_phc(self.password_hash),
            enabled: self.enabled,
            roles,
            created_at: self.created_at,
        })
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<User, StoreError> {
    UserRow::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to decode user row: {e}")))?
        .into_user()
}

/// Map SQLx errors to `StoreError`, attributing unique violations by
/// constraint name.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some(USERNAME_CONSTRAINT) => return StoreError::UsernameTaken,
                    Some(EMAIL_CONSTRAINT) => return StoreError::EmailTaken,
                    _ => {}
                }
            }
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(roles: &[&str]) -> UserRow {
        UserRow {
            id: uuid::Uuid::now_v7(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".into(),
            enabled: true,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_decodes_roles_including_legacy_prefix() {
        let user = row(&["EMPLOYEE", "ROLE_MANAGER"]).into_user().unwrap();
        assert_eq!(user.roles, BTreeSet::from([Role::Employee, Role::Manager]));
        assert_eq!(user.password_hash.algorithm(), Some("argon2id"));
    }

    #[test]
    fn unknown_stored_role_is_a_backend_error() {
        let err = row(&["EMPLOYEE", "SUPERUSER"]).into_user().unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m.contains("SUPERUSER")));
    }

    #[test]
    fn row_without_roles_is_rejected() {
        assert!(matches!(row(&[]).into_user(), Err(StoreError::Backend(_))));
    }

    #[test]
    fn non_database_errors_map_to_backend() {
        assert!(matches!(
            map_sqlx_error("insert", sqlx::Error::PoolClosed),
            StoreError::Backend(ref m) if m.contains("insert")
        ));
        assert!(matches!(map_sqlx_error("list", sqlx::Error::RowNotFound), StoreError::Backend(_)));
    }
}
