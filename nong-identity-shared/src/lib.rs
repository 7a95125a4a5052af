//! # Nong Identity Shared Library
//!
//! Data layer and auth primitives shared by the identity API server and the
//! console client tooling.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and embedded, reversible migrations
//! - `schema`: Typed schema snapshot and the migration catalog
//! - `models`: Identity, profile and audit tables with their CRUD operations
//! - `time`: UTC normalization for stored timestamps
//! - `auth`: Claims, JWT validation, authorization policies and password hashing

pub mod auth;
pub mod db;
pub mod models;
pub mod schema;
pub mod time;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
