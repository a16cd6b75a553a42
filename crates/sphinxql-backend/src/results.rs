use sphinxql_core::types::{DaemonValue, DocumentId, EntityRef};

/// One matched document, resolved back to its application entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    document_id: DocumentId,
    entity: EntityRef,
    score: f64,
    attributes: Vec<DaemonValue>,
}

impl SearchResult {
    pub(crate) fn new(document_id: DocumentId, entity: EntityRef, attributes: Vec<DaemonValue>) -> Self {
        Self { document_id, entity, score: 0.0, attributes }
    }

    pub(crate) fn set_score(&mut self, score: f64) { self.score = score; }

    pub fn document_id(&self) -> DocumentId { self.document_id }
    pub fn entity(&self) -> &EntityRef { &self.entity }
    /// Daemon-assigned relevance; higher is better.
    pub fn score(&self) -> f64 { self.score }
    /// Row columns after the id and score, in daemon order.
    pub fn attributes(&self) -> &[DaemonValue] { &self.attributes }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub hits: usize,
}

/// Outcome of a `clear`: how many paged rounds ran and how many identity
/// records they removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub rounds: usize,
    pub removed: usize,
}
