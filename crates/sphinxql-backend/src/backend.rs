//! Backend façade: writes, removals, clears and searches against the daemon.
//!
//! Every public operation opens its own connection and drops it before
//! returning. The identity store and the daemon are not updated atomically;
//! see the notes on each operation for which orphan a failure leaves behind.
//! The daemon only marks deleted rows (kill-list), so a `DELETE` takes
//! effect lazily on its side.

use std::io::Read;
use tracing::{debug, info};

use sphinxql_core::coerce::coerce;
use sphinxql_core::config::{ConnectionOptions, ResolvedOptions};
use sphinxql_core::query::{is_identifier, QuerySpec};
use sphinxql_core::traits::{Connector, DaemonConnection, IdentityStore, IndexDefinition, QueryCompiler, SearchBackend};
use sphinxql_core::types::{DaemonValue, DocumentId, EntityKey, EntityRef, PreparedFields, Row};
use sphinxql_core::{Error, Result};
use sphinxql_identity::SqliteIdentityStore;

use crate::compiler::SphinxQueryCompiler;
use crate::results::{ClearReport, SearchResponse, SearchResult};

/// Row key column on the daemon side.
pub const ID_FIELD: &str = "id";

pub struct SphinxBackend<C, S> {
    options: ResolvedOptions,
    connector: C,
    store: S,
    compiler: SphinxQueryCompiler,
}

impl<C: Connector> SphinxBackend<C, SqliteIdentityStore> {
    /// Builds a backend whose identity store lives at the configured `IDENTITY_DB`.
    pub fn open(options: &ConnectionOptions, connector: C) -> Result<Self> {
        let resolved = options.resolve()?;
        let store = SqliteIdentityStore::open(&resolved.identity_db)?;
        Self::from_resolved(resolved, connector, store)
    }
}

impl<C: Connector, S: IdentityStore> SphinxBackend<C, S> {
    /// Validates `options` before anything touches the network.
    pub fn new(options: &ConnectionOptions, connector: C, store: S) -> Result<Self> {
        Self::from_resolved(options.resolve()?, connector, store)
    }

    fn from_resolved(options: ResolvedOptions, connector: C, store: S) -> Result<Self> {
        let compiler = SphinxQueryCompiler::new(options.index_name.clone())?;
        Ok(Self { options, connector, store, compiler })
    }

    pub fn with_field_alias(mut self, field: impl Into<String>, index_field: impl Into<String>) -> Self {
        self.compiler = self.compiler.with_alias(field, index_field);
        self
    }

    pub fn index_name(&self) -> &str { &self.options.index_name }
    pub fn options(&self) -> &ResolvedOptions { &self.options }
    pub fn store(&self) -> &S { &self.store }
    pub fn compiler(&self) -> &SphinxQueryCompiler { &self.compiler }

    fn connect(&self) -> Result<Box<dyn DaemonConnection>> { self.connector.connect(&self.options.endpoint) }

    /// Extracts and coerces one entity's declared fields, in column order.
    fn prepare_row<D: IndexDefinition>(&self, index: &D, entity: &D::Entity, fields: &[String]) -> Result<Vec<DaemonValue>> {
        let mut prepared: PreparedFields = index.full_prepare(entity)?;
        let mut row = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            let value = prepared.remove(field).ok_or_else(|| Error::MissingField(field.clone()))?;
            row.push(coerce(&value));
        }
        Ok(row)
    }
}

/// Splits a search row into document id, score and the remaining columns.
fn split_row(row: Row) -> Result<(DocumentId, f64, Vec<DaemonValue>)> {
    let mut columns = row.into_iter();
    let id = columns
        .next()
        .and_then(|v| v.as_i64())
        .and_then(|i| u64::try_from(i).ok())
        .ok_or_else(|| Error::Daemon("result row without a document id".into()))?;
    let score = columns
        .next()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::Daemon(format!("result row {} without a relevance score", id)))?;
    Ok((DocumentId(id), score, columns.collect()))
}

impl<C: Connector, S: IdentityStore> SearchBackend for SphinxBackend<C, S> {
    type Response = SearchResponse;
    type ClearReport = ClearReport;

    /// Upserts `entities` with one batched `REPLACE INTO`.
    ///
    /// Document ids are allocated before the daemon write. A failed write
    /// leaves identity records without daemon rows; a retry reuses them.
    fn update<D: IndexDefinition>(&self, index: &D, entities: &[D::Entity]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let fields: Vec<String> = index.field_names().into_iter().filter(|f| f != ID_FIELD).collect();
        if let Some(bad) = fields.iter().find(|f| !is_identifier(f)) {
            return Err(Error::InvalidField(bad.clone()));
        }

        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities {
            let values = self.prepare_row(index, entity, &fields)?;
            let document_id = self.store.get_or_create(&index.entity_ref(entity))?;
            let mut row = Vec::with_capacity(values.len() + 1);
            row.push(DaemonValue::from(document_id));
            row.extend(values);
            rows.push(row);
        }

        let columns: Vec<&str> = std::iter::once(ID_FIELD).chain(fields.iter().map(String::as_str)).collect();
        let statement = format!(
            "REPLACE INTO {} ({}) VALUES ({})",
            self.options.index_name,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        debug!(statement = %statement, rows = rows.len(), "writing batch");
        let mut conn = self.connect()?;
        conn.execute_batch(&statement, &rows)?;
        Ok(())
    }

    /// Deletes the daemon row first, then the identity record, so a crash in
    /// between leaves an identity record that the next `clear` collects.
    ///
    /// A serialized key with a numeric id falls back to the text primary key
    /// of the same spelling when no integer key is recorded.
    fn remove(&self, key: &EntityKey) -> Result<()> {
        let mut found = None;
        for candidate in key.candidates()? {
            if let Some(document_id) = self.store.find(&candidate)? {
                found = Some((candidate, document_id));
                break;
            }
        }
        let Some((entity, document_id)) = found else {
            debug!(key = ?key, "already removed");
            return Ok(());
        };
        {
            let mut conn = self.connect()?;
            let statement = format!("DELETE FROM {} WHERE {} = ?", self.options.index_name, ID_FIELD);
            conn.execute(&statement, &[DaemonValue::from(document_id)])?;
        }
        self.store.delete(&entity)?;
        debug!(entity = %entity, document_id = %document_id, "removed");
        Ok(())
    }

    /// Pages through identity records of `kinds` (every kind when empty),
    /// deleting each page from the daemon and then from the store, until
    /// none remain. Safe to rerun after an interruption.
    fn clear(&self, kinds: &[String]) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        let page_size = self.options.clear_page_size;
        let mut ids = self.store.page(kinds, page_size)?;
        if ids.is_empty() {
            return Ok(report);
        }
        let mut conn = self.connect()?;
        while !ids.is_empty() {
            let list = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            let statement = format!("DELETE FROM {} WHERE {} IN ({})", self.options.index_name, ID_FIELD, list);
            conn.execute(&statement, &[])?;
            let removed = self.store.delete_batch(&ids)?;
            let next = self.store.page(kinds, page_size)?;
            if removed == 0 {
                // Another clear or remove got there first, unless the page is stuck.
                if next == ids {
                    return Err(Error::Store(format!("page of {} identity records was not deleted", ids.len())));
                }
                debug!(page = ids.len(), "page already removed elsewhere");
            } else {
                report.rounds += 1;
                report.removed += removed;
            }
            ids = next;
        }
        info!(index = %self.options.index_name, rounds = report.rounds, removed = report.removed, "cleared index");
        Ok(report)
    }

    /// Runs the compiled query and maps rows back to entities. Rows whose
    /// document id no longer resolves are stale and skipped.
    fn search(&self, spec: &QuerySpec) -> Result<SearchResponse> {
        let compiled = self.compiler.compile(spec)?;
        let rows = {
            let mut conn = self.connect()?;
            let mut cursor = conn.query(&compiled.statement, &compiled.params)?;
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_next()? {
                rows.push(row);
            }
            rows
        };

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let (document_id, score, attributes) = split_row(row)?;
            let entity = match self.store.resolve(document_id) {
                Ok(entity) => entity,
                Err(Error::NotFound(_)) => {
                    debug!(document_id = %document_id, "skipping stale daemon row");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let mut result = SearchResult::new(document_id, entity, attributes);
            result.set_score(score);
            results.push(result);
        }
        let hits = results.len();
        Ok(SearchResponse { results, hits })
    }

    fn more_like_this(&self, _entity: &EntityRef, _additional_query: Option<&str>) -> Result<SearchResponse> {
        Err(Error::UnsupportedOperation("more_like_this: similarity search is not implemented"))
    }

    fn extract_file_contents(&self, _file: &mut dyn Read) -> Result<PreparedFields> {
        Err(Error::UnsupportedOperation("extract_file_contents: file content extraction is not implemented"))
    }

    fn build_schema(&self, _fields: &[String]) -> Result<String> {
        Err(Error::UnsupportedOperation("build_schema: the index is defined in the daemon configuration"))
    }
}
