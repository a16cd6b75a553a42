//! sphinxql-backend
//!
//! Search backend speaking the daemon's SQL dialect: a query compiler for
//! the extended match syntax and a façade for indexing, removal, clearing
//! and search. See `examples/compile.rs` for printing compiled statements.

pub mod backend;
pub mod compiler;
pub mod results;

pub use backend::SphinxBackend;
pub use compiler::SphinxQueryCompiler;
pub use results::{ClearReport, SearchResponse, SearchResult};
