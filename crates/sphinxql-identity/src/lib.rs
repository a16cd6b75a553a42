//! sphinxql-identity
//!
//! Durable mapping between application entities and the flat integer
//! document ids the daemon keys its rows on.

pub mod sqlite;

pub use sqlite::SqliteIdentityStore;
