//! Persistence for user credentials and refresh tokens.
//!
//! The authentication core only talks to the [`RefreshTokenStore`] and
//! [`UserStore`] traits. [`DbOperations`] backs them with Postgres,
//! [`InMemoryStore`] with process memory.

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::InMemoryStore;
pub use models::{RefreshTokenRecord, UserCredential};
pub use operations::DbOperations;
pub use store::{RefreshTokenStore, UserStore};
