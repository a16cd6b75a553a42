use std::io::Read;

use crate::query::QuerySpec;
use crate::types::{DaemonValue, DocumentId, EntityKey, EntityRef, PreparedFields, Row};
use crate::Result;

/// Describes which fields of an entity are indexed and how to extract them.
pub trait IndexDefinition {
    type Entity;

    /// Declared field names, in the column order used for writes.
    fn field_names(&self) -> Vec<String>;
    /// Extracts every declared field from `entity`.
    fn full_prepare(&self, entity: &Self::Entity) -> Result<PreparedFields>;
    /// Derives the entity reference the identity store keys on.
    fn entity_ref(&self, entity: &Self::Entity) -> EntityRef;
}

/// Durable `(entity_kind, entity_id)` to document id mapping.
///
/// Implementations rely on the storage layer for atomicity: `get_or_create`
/// must never hand out two ids for one entity, even across workers.
pub trait IdentityStore: Send + Sync {
    fn get_or_create(&self, entity: &EntityRef) -> Result<DocumentId>;
    fn find(&self, entity: &EntityRef) -> Result<Option<DocumentId>>;
    /// Fails with `Error::NotFound` when no record owns `id`.
    fn resolve(&self, id: DocumentId) -> Result<EntityRef>;
    /// Returns whether a record was removed; absent records are not an error.
    fn delete(&self, entity: &EntityRef) -> Result<bool>;
    /// Returns how many of `ids` still existed and were removed.
    fn delete_batch(&self, ids: &[DocumentId]) -> Result<usize>;
    /// Up to `limit` ids in ascending order, restricted to `kinds` unless it is empty.
    fn page(&self, kinds: &[String], limit: usize) -> Result<Vec<DocumentId>>;
}

/// Where and how to reach the daemon's SQL listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub pooled: bool,
}

/// Opens connections to the daemon. Errors map to `Error::Connection`.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DaemonConnection>>;
}

/// One open daemon session. Dropping it releases the connection.
pub trait DaemonConnection {
    /// Runs one statement with bound `params`; returns affected rows.
    fn execute(&mut self, statement: &str, params: &[DaemonValue]) -> Result<u64>;
    /// Runs `statement` once per parameter row.
    fn execute_batch(&mut self, statement: &str, rows: &[Vec<DaemonValue>]) -> Result<u64>;
    fn query<'a>(&'a mut self, statement: &str, params: &[DaemonValue]) -> Result<Box<dyn Cursor + 'a>>;
}

/// Fetch-next view over a result set.
pub trait Cursor {
    fn fetch_next(&mut self) -> Result<Option<Row>>;
}

/// Statement text plus the parameters bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub statement: String,
    pub params: Vec<DaemonValue>,
}

pub trait QueryCompiler {
    fn compile(&self, spec: &QuerySpec) -> Result<CompiledQuery>;
}

pub trait SearchBackend {
    type Response;
    type ClearReport;

    fn update<D: IndexDefinition>(&self, index: &D, entities: &[D::Entity]) -> Result<()>;
    fn remove(&self, key: &EntityKey) -> Result<()>;
    fn clear(&self, kinds: &[String]) -> Result<Self::ClearReport>;
    fn search(&self, spec: &QuerySpec) -> Result<Self::Response>;
    fn more_like_this(&self, entity: &EntityRef, additional_query: Option<&str>) -> Result<Self::Response>;
    fn extract_file_contents(&self, file: &mut dyn Read) -> Result<PreparedFields>;
    fn build_schema(&self, fields: &[String]) -> Result<String>;
}
