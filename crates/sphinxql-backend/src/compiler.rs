//! Compiles a [`QuerySpec`] into a daemon `SELECT`.
//!
//! Free text and field filters become one extended-syntax match expression
//! bound as the single `MATCH(?)` parameter. Filter values are escaped with
//! the daemon's escaping rules before they join the expression; the free
//! text is not, because it carries the caller's own operators. That makes the
//! free text an injection surface into the match grammar (not into SQL): the
//! protocol cannot parameterize parts of a match expression.

use std::collections::HashMap;
use tracing::debug;

use sphinxql_core::coerce::coerce;
use sphinxql_core::query::{is_identifier, FieldFilter, FilterKind, QuerySpec, SortField};
use sphinxql_core::traits::{CompiledQuery, QueryCompiler};
use sphinxql_core::types::DaemonValue;
use sphinxql_core::{Error, Result};

/// Catch-all document field; filters on it match any index field (`@*`).
pub const CONTENT_FIELD: &str = "content";

/// Characters with a meaning in the extended query syntax.
const SPECIAL_CHARS: &[char] = &['\\', '(', ')', '|', '-', '!', '@', '~', '"', '&', '/', '^', '$', '=', '<'];

pub struct SphinxQueryCompiler {
    index_name: String,
    aliases: HashMap<String, String>,
}

impl SphinxQueryCompiler {
    /// Fails with `InvalidIndexName` unless `index_name` is a plain identifier;
    /// it is spliced into every statement.
    pub fn new(index_name: impl Into<String>) -> Result<Self> {
        let index_name = index_name.into();
        if !is_identifier(&index_name) {
            return Err(Error::InvalidIndexName(index_name));
        }
        Ok(Self { index_name, aliases: HashMap::new() })
    }

    /// Maps an application field name to the index field it is stored under.
    pub fn with_alias(mut self, field: impl Into<String>, index_field: impl Into<String>) -> Self {
        self.aliases.insert(field.into(), index_field.into());
        self
    }

    pub fn index_name(&self) -> &str { &self.index_name }

    fn index_field<'a>(&'a self, field: &'a str) -> Result<&'a str> {
        let resolved = self.aliases.get(field).map(String::as_str).unwrap_or(field);
        if is_identifier(resolved) { Ok(resolved) } else { Err(Error::InvalidField(field.to_string())) }
    }

    /// `@*` for the content field, `@name` otherwise.
    fn scope(&self, field: &str) -> Result<String> {
        if field == CONTENT_FIELD {
            Ok("@*".to_string())
        } else {
            Ok(format!("@{}", self.index_field(field)?))
        }
    }

    /// One extended-syntax fragment for a field filter.
    pub fn fragment(&self, filter: &FieldFilter) -> Result<String> {
        let scope = self.scope(&filter.field)?;
        let term = filter.value.trim();
        if term.is_empty() {
            return Err(Error::EmptyFilterValue { field: filter.field.clone() });
        }
        let value = escape(term);
        match filter.kind {
            FilterKind::Contains => Ok(format!("{} {}", scope, value)),
            FilterKind::StartsWith => Ok(format!("{} {}^", scope, value)),
            FilterKind::Exact => Ok(format!("{}={}", scope, value)),
            other => Err(Error::UnsupportedFilter { field: filter.field.clone(), kind: other.to_string() }),
        }
    }

    /// The full match expression: free text first, then every filter.
    pub fn match_expression(&self, spec: &QuerySpec) -> Result<String> {
        let mut parts = Vec::with_capacity(spec.filters.len() + 1);
        if let Some(text) = spec.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(format!("@* {}", text));
        }
        for filter in &spec.filters {
            parts.push(self.fragment(filter)?);
        }
        Ok(parts.join(" "))
    }

    fn order_by(&self, sort: &[SortField]) -> Result<Option<String>> {
        let Some(first) = sort.first() else { return Ok(None) };
        let descending = first.descending;
        let mut fields = Vec::with_capacity(sort.len());
        for s in sort {
            if s.descending != descending {
                return Err(Error::MixedSortDirection { field: s.field.clone() });
            }
            fields.push(self.index_field(&s.field)?);
        }
        Ok(Some(format!("ORDER BY {} {}", fields.join(", "), if descending { "DESC" } else { "ASC" })))
    }
}

impl QueryCompiler for SphinxQueryCompiler {
    fn compile(&self, spec: &QuerySpec) -> Result<CompiledQuery> {
        let expression = self.match_expression(spec)?;
        let mut statement = format!("SELECT * FROM {} WHERE MATCH(?)", self.index_name);
        let mut params = vec![DaemonValue::Text(expression)];
        for attr in &spec.attribute_filters {
            statement.push_str(&format!(" AND {} = ?", self.index_field(&attr.field)?));
            params.push(coerce(&attr.value));
        }
        if let Some(order) = self.order_by(&spec.sort)? {
            statement.push(' ');
            statement.push_str(&order);
        }
        if let Some(limit) = limit_clause(spec.offset, spec.limit)? {
            statement.push(' ');
            statement.push_str(&limit);
        }
        debug!(statement = %statement, params = ?params, "compiled query");
        Ok(CompiledQuery { statement, params })
    }
}

fn limit_clause(offset: Option<u64>, limit: Option<u64>) -> Result<Option<String>> {
    match (offset.filter(|o| *o > 0), limit) {
        (Some(offset), Some(limit)) => Ok(Some(format!("LIMIT {}, {}", offset, limit))),
        (None, Some(limit)) => Ok(Some(format!("LIMIT {}", limit))),
        (Some(offset), None) => Err(Error::InvalidPagination { offset }),
        (None, None) => Ok(None),
    }
}

/// Backslash-escapes extended-syntax operators in a literal term.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if SPECIAL_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
