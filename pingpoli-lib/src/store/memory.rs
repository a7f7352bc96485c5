use std::borrow::Cow;

use tracing::debug;

use crate::store::{validate_record, EmbeddingRecord, EmbeddingStore, Scan};
use crate::Result;

/// In-memory embedding store.
///
/// Keeps records in insertion order. This is the backing store for
/// [`SharedStore`](crate::store::SharedStore) snapshots and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<EmbeddingRecord>,
    dimension: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}

impl EmbeddingStore for MemoryStore {
    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.dimension = None;
        Ok(())
    }

    fn insert(&mut self, record: EmbeddingRecord) -> Result<()> {
        validate_record(&record, self.dimension)?;

        debug!(source_id = %record.source_id, dim = record.embedding.len(), "insert");
        self.dimension = Some(record.embedding.len());
        self.records.push(record);
        Ok(())
    }

    fn scan(&self) -> Result<Scan<'_>> {
        Ok(Box::new(self.records.iter().map(|r| Ok(Cow::Borrowed(r)))))
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
