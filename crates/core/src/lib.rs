//! `taskdesk-core`: shared identifiers and the domain error model.
//!
//! This crate has no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ProjectId, TaskId, UserId};
