//! Structured query handed to a [`QueryCompiler`](crate::traits::QueryCompiler).

use std::fmt;
use std::str::FromStr;

use crate::types::FieldValue;

/// Lookup kind of a field-scoped filter.
///
/// Only `Contains`, `StartsWith` and `Exact` have an extended-syntax form;
/// the compiler rejects the others instead of dropping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Contains,
    StartsWith,
    Exact,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Range,
    Fuzzy,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Contains => "contains",
            FilterKind::StartsWith => "startswith",
            FilterKind::Exact => "exact",
            FilterKind::EndsWith => "endswith",
            FilterKind::Gt => "gt",
            FilterKind::Gte => "gte",
            FilterKind::Lt => "lt",
            FilterKind::Lte => "lte",
            FilterKind::In => "in",
            FilterKind::Range => "range",
            FilterKind::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Parses a lookup name such as `startswith`. Unknown names are reported
/// as an unsupported filter on an unnamed field; [`FieldFilter::parse`]
/// attaches the field.
impl FromStr for FilterKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "contains" => FilterKind::Contains,
            "startswith" => FilterKind::StartsWith,
            "exact" => FilterKind::Exact,
            "endswith" => FilterKind::EndsWith,
            "gt" => FilterKind::Gt,
            "gte" => FilterKind::Gte,
            "lt" => FilterKind::Lt,
            "lte" => FilterKind::Lte,
            "in" => FilterKind::In,
            "range" => FilterKind::Range,
            "fuzzy" => FilterKind::Fuzzy,
            other => return Err(crate::Error::UnsupportedFilter { field: String::new(), kind: other.to_string() }),
        };
        Ok(kind)
    }
}

/// One `(field, kind, value)` clause inside the match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub kind: FilterKind,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, kind: FilterKind, value: impl Into<String>) -> Self {
        Self { field: field.into(), kind, value: value.into() }
    }

    /// Builds a filter from a textual lookup name.
    pub fn parse(field: impl Into<String>, kind: &str, value: impl Into<String>) -> crate::Result<Self> {
        let field = field.into();
        match kind.parse::<FilterKind>() {
            Ok(kind) => Ok(Self { field, kind, value: value.into() }),
            Err(_) => Err(crate::Error::UnsupportedFilter { field, kind: kind.to_string() }),
        }
    }
}

/// `AND attr = ?` clause on a non-full-text attribute; the value is bound.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub field: String,
    pub value: FieldValue,
}

/// True for names that can be spliced into statement text as-is.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self { Self { field: field.into(), descending: false } }

    pub fn desc(field: impl Into<String>) -> Self { Self { field: field.into(), descending: true } }

    /// `-field` sorts descending, anything else ascending.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(spec),
        }
    }
}

/// Free text, filters, sort and pagination window of one search.
///
/// `offset` and `limit` are independent: a limit alone is fine, an offset
/// alone is rejected at compile time. An offset of zero counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub text: Option<String>,
    pub filters: Vec<FieldFilter>,
    pub attribute_filters: Vec<AttributeFilter>,
    pub sort: Vec<SortField>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QuerySpec {
    pub fn new() -> Self { Self::default() }

    pub fn matching(text: impl Into<String>) -> Self { Self { text: Some(text.into()), ..Self::default() } }

    pub fn filter(mut self, field: impl Into<String>, kind: FilterKind, value: impl Into<String>) -> Self {
        self.filters.push(FieldFilter::new(field, kind, value));
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attribute_filters.push(AttributeFilter { field: field.into(), value: value.into() });
        self
    }

    pub fn order_by(mut self, spec: &str) -> Self {
        self.sort.push(SortField::parse(spec));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
