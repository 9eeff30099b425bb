//! # TaskTrack Shared Library
//!
//! Domain types, persistence and business rules used by the TaskTrack API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Entity types and their PostgreSQL row operations
//! - `db`: Connection pool and migrations
//! - `store`: The `Store` trait with in-memory and PostgreSQL adapters
//! - `auth`: Passwords, session tokens and the access control gate
//! - `lifecycle`: Validation and lifecycle rules for every entity
//! - `search`: Project/task search aggregation

pub mod auth;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod search;
pub mod store;

/// Current version of the TaskTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
