//! sphinxql-core
//!
//! Types, errors, collaborator traits, value coercion and configuration
//! shared by the identity store and the sphinx backend.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod coerce;
pub mod config;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
