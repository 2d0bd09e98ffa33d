//! HTTP API: configuration, routing, request authentication and error mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
pub mod seed;
