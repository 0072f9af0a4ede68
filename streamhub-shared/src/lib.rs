//! # Stream Hub Shared Library
//!
//! Identity and session core for the Stream Hub API: accounts, credentials,
//! token pairs, session authentication and the derived profile views.
//!
//! ## Module Organization
//!
//! - `models`: account, video and subscription records and their projections
//! - `store`: storage traits with PostgreSQL and in-memory implementations
//! - `credentials`: account registration, lookup and updates
//! - `auth`: passwords, JWTs, token rotation and the session middleware
//! - `profile`: channel profile and watch history aggregation
//! - `media`: avatar/cover image storage
//! - `db`: connection pool and migrations

pub mod auth;
pub mod credentials;
pub mod db;
pub mod media;
pub mod models;
pub mod profile;
pub mod store;

/// Current version of the Stream Hub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
