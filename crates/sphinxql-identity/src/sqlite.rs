//! SQLite-backed identity store.
//!
//! One row per `(entity_kind, entity_id)`; the row's AUTOINCREMENT key is the
//! document id sent to the daemon, so ids are never handed out twice. The
//! `entity_id` column has no declared type: integer `42` and text `'42'`
//! stay distinct keys.

use parking_lot::Mutex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use sphinxql_core::traits::IdentityStore;
use sphinxql_core::types::{DocumentId, EntityId, EntityRef};
use sphinxql_core::{Error, Result};

/// SQLite caps bound parameters per statement; batches are split below it.
const DELETE_CHUNK: usize = 500;

pub struct SqliteIdentityStore {
    conn: Mutex<Connection>,
}

impl SqliteIdentityStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("creating identity db directory {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(store_err)?;
        conn.execute_batch(
            r"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )
        .map_err(store_err)?;
        debug!(path = %path.display(), "opened identity store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(store_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(store_err)?;
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_kind TEXT NOT NULL,
                entity_id NOT NULL,
                UNIQUE (entity_kind, entity_id)
            );
            ",
        )
        .map_err(store_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Number of identity records, optionally restricted to `kinds`.
    pub fn count(&self, kinds: &[String]) -> Result<usize> {
        let conn = self.conn.lock();
        let sql = format!("SELECT COUNT(*) FROM documents{}", kind_clause(kinds));
        let n: i64 = conn.query_row(&sql, params_from_iter(kinds.iter()), |r| r.get(0)).map_err(store_err)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn get_or_create(&self, entity: &EntityRef) -> Result<DocumentId> {
        let conn = self.conn.lock();
        let key = entity_value(&entity.id);
        // Unique constraint decides the race; the loser rereads the winner's id.
        let inserted = conn
            .execute(
                "INSERT INTO documents (entity_kind, entity_id) VALUES (?1, ?2)
                 ON CONFLICT (entity_kind, entity_id) DO NOTHING",
                params![entity.kind, key],
            )
            .map_err(store_err)?;
        let id: i64 = conn
            .query_row(
                "SELECT id FROM documents WHERE entity_kind = ?1 AND entity_id = ?2",
                params![entity.kind, key],
                |r| r.get(0),
            )
            .map_err(store_err)?;
        if inserted > 0 {
            debug!(entity = %entity, document_id = id, "allocated document id");
        }
        Ok(to_document_id(id))
    }

    fn find(&self, entity: &EntityRef) -> Result<Option<DocumentId>> {
        let conn = self.conn.lock();
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM documents WHERE entity_kind = ?1 AND entity_id = ?2",
                params![entity.kind, entity_value(&entity.id)],
                |r| r.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(id.map(to_document_id))
    }

    fn resolve(&self, id: DocumentId) -> Result<EntityRef> {
        let Ok(raw) = i64::try_from(id.0) else { return Err(Error::NotFound(id)) };
        let conn = self.conn.lock();
        conn.query_row("SELECT entity_kind, entity_id FROM documents WHERE id = ?1", [raw], |r| {
            let kind: String = r.get(0)?;
            let entity_id = match r.get_ref(1)? {
                ValueRef::Integer(i) => EntityId::Int(i),
                ValueRef::Text(t) => EntityId::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Real(f) => EntityId::Text(f.to_string()),
                ValueRef::Blob(b) => EntityId::Text(String::from_utf8_lossy(b).into_owned()),
                ValueRef::Null => EntityId::Text(String::new()),
            };
            Ok(EntityRef { kind, id: entity_id })
        })
        .optional()
        .map_err(store_err)?
        .ok_or(Error::NotFound(id))
    }

    fn delete(&self, entity: &EntityRef) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM documents WHERE entity_kind = ?1 AND entity_id = ?2",
                params![entity.kind, entity_value(&entity.id)],
            )
            .map_err(store_err)?;
        Ok(removed > 0)
    }

    fn delete_batch(&self, ids: &[DocumentId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(store_err)?;
        let mut removed = 0usize;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let raw: Vec<i64> = chunk.iter().filter_map(|d| i64::try_from(d.0).ok()).collect();
            if raw.is_empty() {
                continue;
            }
            let sql = format!("DELETE FROM documents WHERE id IN ({})", placeholders(raw.len()));
            removed += tx.execute(&sql, params_from_iter(raw.iter())).map_err(store_err)?;
        }
        tx.commit().map_err(store_err)?;
        Ok(removed)
    }

    fn page(&self, kinds: &[String], limit: usize) -> Result<Vec<DocumentId>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT id FROM documents{} ORDER BY id LIMIT {}", kind_clause(kinds), limit);
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let ids = stmt
            .query_map(params_from_iter(kinds.iter()), |r| r.get::<_, i64>(0))
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        Ok(ids.into_iter().map(to_document_id).collect())
    }
}

fn entity_value(id: &EntityId) -> Value {
    match id {
        EntityId::Int(i) => Value::Integer(*i),
        EntityId::Text(s) => Value::Text(s.clone()),
    }
}

fn to_document_id(raw: i64) -> DocumentId { DocumentId(u64::try_from(raw).unwrap_or_default()) }

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn kind_clause(kinds: &[String]) -> String {
    if kinds.is_empty() { String::new() } else { format!(" WHERE entity_kind IN ({})", placeholders(kinds.len())) }
}

fn store_err(e: rusqlite::Error) -> Error { Error::Store(e.to_string()) }
