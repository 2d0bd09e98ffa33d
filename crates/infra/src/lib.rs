//! Infrastructure layer: database connectivity and persistent stores.

pub mod db;
pub mod user_store;

pub use db::{DbError, connect};
pub use user_store::PostgresUserStore;
