//! # Recipe Shared Library
//!
//! Types, persistence and auth primitives used by the recipe API server
//! and the `recipe-admin` tool.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and migrations
//! - `models`: users, tokens, tags/ingredients and recipes
//! - `auth`: password hashing, bearer tokens and request authentication
//! - `media`: recipe image validation and file storage

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
