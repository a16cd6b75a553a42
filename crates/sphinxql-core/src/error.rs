use thiserror::Error;

use crate::types::DocumentId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing {key} for the sphinx backend. Please define {key}.")]
    Configuration { key: &'static str },

    #[error("Daemon connection failed: {0}")]
    Connection(String),

    #[error("Daemon rejected statement: {0}")]
    Daemon(String),

    #[error("Operation not supported by the sphinx backend: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Unsupported filter '{kind}' on field '{field}'")]
    UnsupportedFilter { field: String, kind: String },

    #[error("Filter on field '{field}' has an empty value; the match syntax needs a term")]
    EmptyFilterValue { field: String },

    #[error("Sphinx can only sort by ASC or DESC, not a mix of the two (at '{field}')")]
    MixedSortDirection { field: String },

    #[error("Offset {offset} requires a limit; the daemon cannot skip rows without one")]
    InvalidPagination { offset: u64 },

    #[error("Invalid field name '{0}'")]
    InvalidField(String),

    #[error("Invalid index name '{0}'")]
    InvalidIndexName(String),

    #[error("Invalid entity identifier '{0}', expected 'app.model.id'")]
    InvalidIdentifier(String),

    #[error("Index definition did not prepare declared field '{0}'")]
    MissingField(String),

    #[error("Failed to prepare entity {entity}: {reason}")]
    Preparation { entity: String, reason: String },

    #[error("No document with id {0}")]
    NotFound(DocumentId),

    #[error("Identity store failure: {0}")]
    Store(String),
}

impl Error {
    /// True for errors raised while compiling a query, before any daemon round-trip.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFilter { .. }
                | Error::EmptyFilterValue { .. }
                | Error::MixedSortDirection { .. }
                | Error::InvalidPagination { .. }
                | Error::InvalidField(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
