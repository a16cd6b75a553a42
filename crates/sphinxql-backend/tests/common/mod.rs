//! In-memory daemon double and sample index definitions.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use sphinxql_core::traits::{Connector, Cursor, DaemonConnection, Endpoint, IndexDefinition};
use sphinxql_core::types::{DaemonValue, EntityRef, FieldValue, PreparedFields, Row};
use sphinxql_core::{Error, Result};

#[derive(Debug, Default)]
pub struct DaemonState {
    pub connects: usize,
    pub open: usize,
    pub endpoints: Vec<Endpoint>,
    pub executed: Vec<(String, Vec<DaemonValue>)>,
    pub batches: Vec<(String, Vec<Vec<DaemonValue>>)>,
    pub queries: Vec<(String, Vec<DaemonValue>)>,
    pub rows: Vec<Row>,
    pub refuse_connections: bool,
    /// Statements fail once this many `execute` calls have succeeded.
    pub fail_after_executes: Option<usize>,
    pub fail_writes: bool,
}

/// Records every statement and serves `rows` to any query.
#[derive(Clone, Default)]
pub struct MemoryDaemon {
    pub state: Arc<Mutex<DaemonState>>,
}

impl MemoryDaemon {
    pub fn new() -> Self { Self::default() }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        let daemon = Self::default();
        daemon.state.lock().rows = rows;
        daemon
    }

    pub fn connects(&self) -> usize { self.state.lock().connects }
    pub fn open(&self) -> usize { self.state.lock().open }
}

impl Connector for MemoryDaemon {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DaemonConnection>> {
        let mut state = self.state.lock();
        if state.refuse_connections {
            return Err(Error::Connection(format!("connection refused by {}:{}", endpoint.host, endpoint.port)));
        }
        state.connects += 1;
        state.open += 1;
        state.endpoints.push(endpoint.clone());
        Ok(Box::new(MemoryConnection { state: Arc::clone(&self.state) }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<DaemonState>>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) { self.state.lock().open -= 1; }
}

impl DaemonConnection for MemoryConnection {
    fn execute(&mut self, statement: &str, params: &[DaemonValue]) -> Result<u64> {
        let mut state = self.state.lock();
        if state.fail_after_executes == Some(state.executed.len()) {
            return Err(Error::Connection("lost connection to daemon".into()));
        }
        state.executed.push((statement.to_string(), params.to_vec()));
        Ok(1)
    }

    fn execute_batch(&mut self, statement: &str, rows: &[Vec<DaemonValue>]) -> Result<u64> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(Error::Connection("lost connection to daemon".into()));
        }
        state.batches.push((statement.to_string(), rows.to_vec()));
        Ok(rows.len() as u64)
    }

    fn query<'a>(&'a mut self, statement: &str, params: &[DaemonValue]) -> Result<Box<dyn Cursor + 'a>> {
        let mut state = self.state.lock();
        state.queries.push((statement.to_string(), params.to_vec()));
        Ok(Box::new(VecCursor { rows: state.rows.clone().into_iter() }))
    }
}

struct VecCursor {
    rows: std::vec::IntoIter<Row>,
}

impl Cursor for VecCursor {
    fn fetch_next(&mut self) -> Result<Option<Row>> { Ok(self.rows.next()) }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub published: bool,
    pub tags: Vec<String>,
}

impl Post {
    pub fn new(id: i64, title: &str) -> Self {
        Self { id, title: title.to_string(), published: true, tags: vec!["rust".into(), "search".into()] }
    }
}

pub struct PostIndex;

impl IndexDefinition for PostIndex {
    type Entity = Post;

    fn field_names(&self) -> Vec<String> { vec!["title".into(), "published".into(), "tags".into()] }

    fn full_prepare(&self, post: &Post) -> Result<PreparedFields> {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), FieldValue::from(post.title.as_str()));
        fields.insert("published".to_string(), FieldValue::from(post.published));
        fields.insert("tags".to_string(), FieldValue::from(post.tags.clone()));
        Ok(fields)
    }

    fn entity_ref(&self, post: &Post) -> EntityRef { EntityRef::new("blog.post", post.id) }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub body: String,
}

pub struct CommentIndex;

impl IndexDefinition for CommentIndex {
    type Entity = Comment;

    fn field_names(&self) -> Vec<String> { vec!["id".into(), "body".into()] }

    fn full_prepare(&self, comment: &Comment) -> Result<PreparedFields> {
        let mut fields = HashMap::new();
        fields.insert("body".to_string(), FieldValue::from(comment.body.as_str()));
        Ok(fields)
    }

    fn entity_ref(&self, comment: &Comment) -> EntityRef { EntityRef::new("blog.comment", comment.id) }
}

pub fn row(id: i64, score: i64) -> Row { vec![DaemonValue::Int(id), DaemonValue::Int(score)] }

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
