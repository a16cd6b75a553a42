//! Domain types shared by the identity store, the compiler and the backend.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Dense integer key the daemon uses as its row id.
///
/// Allocated by the identity store; the only identity the daemon ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Application primary key. Integer and text keys are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(i) => write!(f, "{}", i),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self { EntityId::Int(value) }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self { EntityId::Int(i64::from(value)) }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self { EntityId::Int(i64::from(value)) }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self { EntityId::Text(value.to_string()) }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self { EntityId::Text(value) }
}

/// `(entity_kind, entity_id)` pair identifying an application record.
///
/// - `kind`: `app.model` style label, e.g. `blog.post`
/// - `id`: the record's primary key inside that kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self { kind: kind.into(), id: id.into() }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}.{}", self.kind, self.id) }
}

/// Parses the serialized `app.model.id` form. The id keeps any further dots
/// and becomes an integer when it parses as one.
impl FromStr for EntityRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(app), Some(model), Some(id)) if !app.is_empty() && !model.is_empty() && !id.is_empty() => {
                let id = id.parse::<i64>().map(EntityId::Int).unwrap_or_else(|_| EntityId::Text(id.to_string()));
                Ok(Self { kind: format!("{}.{}", app, model), id })
            }
            _ => Err(Error::InvalidIdentifier(s.to_string())),
        }
    }
}

/// What `remove` accepts: a structured reference or its serialized string key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Reference(EntityRef),
    Serialized(String),
}

impl EntityKey {
    pub fn resolve(&self) -> crate::Result<EntityRef> {
        match self {
            EntityKey::Reference(r) => Ok(r.clone()),
            EntityKey::Serialized(s) => s.parse(),
        }
    }

    /// References this key may name, most likely first. A serialized key
    /// with a numeric id also names the text primary key spelled the same
    /// way (`shop.item.00123` could be `Int(123)` or `Text("00123")`).
    pub fn candidates(&self) -> crate::Result<Vec<EntityRef>> {
        let parsed = self.resolve()?;
        let mut out = vec![parsed.clone()];
        if let (EntityKey::Serialized(s), EntityId::Int(_)) = (self, &parsed.id) {
            if let Some(raw) = s.splitn(3, '.').nth(2) {
                out.push(EntityRef { kind: parsed.kind, id: EntityId::Text(raw.to_string()) });
            }
        }
        Ok(out)
    }
}

impl From<EntityRef> for EntityKey {
    fn from(value: EntityRef) -> Self { EntityKey::Reference(value) }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self { EntityKey::Serialized(value.to_string()) }
}

/// Application-side field value, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    List(Vec<FieldValue>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self { FieldValue::Text(value.to_string()) }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self { FieldValue::Text(value) }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self { FieldValue::Int(value) }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self { FieldValue::Int(i64::from(value)) }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self { FieldValue::Float(value) }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self { FieldValue::Bool(value) }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self { FieldValue::Timestamp(value) }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self { FieldValue::List(value.into_iter().map(Into::into).collect()) }
}

/// Scalar the daemon accepts as a bound parameter or returns in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl DaemonValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DaemonValue::Int(i) => Some(*i),
            DaemonValue::Text(s) => s.parse().ok(),
            DaemonValue::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DaemonValue::Int(i) => Some(*i as f64),
            DaemonValue::Float(f) => Some(*f),
            DaemonValue::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for DaemonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonValue::Int(i) => write!(f, "{}", i),
            DaemonValue::Float(x) => write!(f, "{}", x),
            DaemonValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<DocumentId> for DaemonValue {
    fn from(value: DocumentId) -> Self { DaemonValue::Int(i64::try_from(value.0).unwrap_or(i64::MAX)) }
}

/// One result row; columns in daemon order.
pub type Row = Vec<DaemonValue>;

/// Field name to value, as extracted by an index definition.
pub type PreparedFields = HashMap<String, FieldValue>;
