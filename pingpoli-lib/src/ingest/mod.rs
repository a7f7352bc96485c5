//! Store ingestion
//!
//! Every run is a full rebuild: clear the store, then embed and insert each
//! source unit in order. There is no rollback. If a unit fails, the store
//! keeps the records inserted before it and the error is returned. Callers
//! that must never expose a partial store should build off to the side:
//! [`IngestionPipeline::rebuild`] for a [`SharedStore`], or
//! [`JsonlStore::staged`](crate::store::JsonlStore::staged) for files.
//!
//! # Usage
//!
//! ```ignore
//! use pingpoli_lib::ingest::{IngestionPipeline, SourceDir};
//!
//! let mut pipeline = IngestionPipeline::new(embedder);
//! let report = pipeline.run(&mut store, SourceDir::open("data/raw")?)?;
//! println!("indexed {} documents", report.inserted);
//! ```

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::embed::Embedder;
use crate::store::{EmbeddingRecord, EmbeddingStore, MemoryStore, SharedStore};
use crate::Result;

/// One logical document to ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Stored as the record's `source_id`
    pub id: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Outcome of a successful ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Records inserted
    pub inserted: usize,
    /// Dimensionality of the rebuilt store, `None` if nothing was ingested
    pub dimension: Option<usize>,
}

/// Rebuilds embedding stores from source units.
pub struct IngestionPipeline<E: Embedder> {
    embedder: E,
}

impl<E: Embedder> IngestionPipeline<E> {
    #[must_use]
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    /// Clear `store` and repopulate it from `units`.
    ///
    /// Units are pulled lazily and processed in order. The first failure
    /// aborts the run: an unreadable unit as [`Error::Ingestion`], an embedder
    /// failure as [`Error::Embedding`], a rejected record as
    /// [`Error::Validation`].
    ///
    /// [`Error::Ingestion`]: crate::Error::Ingestion
    /// [`Error::Embedding`]: crate::Error::Embedding
    /// [`Error::Validation`]: crate::Error::Validation
    pub fn run<S, I>(&mut self, store: &mut S, units: I) -> Result<IngestReport>
    where
        S: EmbeddingStore + ?Sized,
        I: IntoIterator<Item = Result<SourceUnit>>,
    {
        let started = Instant::now();
        store.clear()?;

        let mut inserted = 0;
        for unit in units {
            let SourceUnit { id, text } = unit.inspect_err(|e| {
                warn!(inserted, error = %e, "ingestion aborted");
            })?;

            debug!(source_id = %id, bytes = text.len(), "embedding");
            let embedding = self.embedder.embed_document(&text)?;
            store.insert(EmbeddingRecord {
                source_id: id,
                text,
                embedding,
            })?;
            inserted += 1;
        }

        let report = IngestReport {
            inserted,
            dimension: store.dimension(),
        };
        info!(
            inserted,
            dimension = ?report.dimension,
            model = self.embedder.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Build a fresh store from `units` and publish it through `shared`.
    ///
    /// On failure the previously active store stays in place untouched.
    pub fn rebuild<I>(&mut self, shared: &SharedStore, units: I) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<SourceUnit>>,
    {
        let mut fresh = MemoryStore::new();
        let report = self.run(&mut fresh, units)?;
        shared.replace(fresh);
        Ok(report)
    }

    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn embedder_mut(&mut self) -> &mut E {
        &mut self.embedder
    }

    #[must_use]
    pub fn into_embedder(self) -> E {
        self.embedder
    }
}

mod source;

pub use source::*;

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::embed::FnEmbedder;
    use crate::Error;

    /// Deterministic stand-in: [byte length, vowel count, 1].
    fn stub() -> FnEmbedder<impl FnMut(&str) -> Result<Vec<f32>> + Send> {
        FnEmbedder::new(|text: &str| {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32, 1.0])
        })
    }

    fn units(pairs: &[(&str, &str)]) -> Vec<Result<SourceUnit>> {
        pairs
            .iter()
            .map(|(id, text)| Ok(SourceUnit::new(*id, *text)))
            .collect()
    }

    fn scanned(store: &MemoryStore) -> Vec<EmbeddingRecord> {
        store
            .scan()
            .unwrap()
            .map(|r| r.unwrap().into_owned())
            .collect()
    }

    #[test]
    fn test_run_inserts_every_unit() {
        let mut pipeline = IngestionPipeline::new(stub());
        let mut store = MemoryStore::new();

        let report = pipeline
            .run(&mut store, units(&[("a.txt", "hello"), ("b.txt", "world")]))
            .unwrap();

        assert_eq!(report, IngestReport { inserted: 2, dimension: Some(3) });
        let records = scanned(&store);
        assert_eq!(records[0].source_id, "a.txt");
        assert_eq!(records[0].text, "hello");
        assert_eq!(records[1].source_id, "b.txt");
        assert_eq!(records[1].text, "world");
    }

    #[test]
    fn test_source_ids_match_input_in_any_order() {
        let pairs = [("c", "três"), ("a", "um"), ("b", "dois"), ("d", "quatro")];
        let mut pipeline = IngestionPipeline::new(stub());
        let mut store = MemoryStore::new();

        pipeline.run(&mut store, units(&pairs)).unwrap();

        let got: HashSet<String> = scanned(&store).into_iter().map(|r| r.source_id).collect();
        let want: HashSet<String> = pairs.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_rerun_replaces_instead_of_accumulating() {
        let pairs = [("a.txt", "hello"), ("b.txt", "world")];
        let mut pipeline = IngestionPipeline::new(stub());
        let mut store = MemoryStore::new();

        pipeline.run(&mut store, units(&pairs)).unwrap();
        pipeline.run(&mut store, units(&pairs)).unwrap();

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_input_clears_store() {
        let mut pipeline = IngestionPipeline::new(stub());
        let mut store = MemoryStore::new();
        pipeline.run(&mut store, units(&[("a", "x")])).unwrap();

        let report = pipeline.run(&mut store, units(&[])).unwrap();

        assert_eq!(report, IngestReport { inserted: 0, dimension: None });
        assert!(store.is_empty());
    }

    #[test]
    fn test_unreadable_unit_keeps_earlier_records() {
        let mut pipeline = IngestionPipeline::new(stub());
        let mut store = MemoryStore::new();

        let input = vec![
            Ok(SourceUnit::new("a.txt", "hello")),
            Err(Error::ingestion("b.txt", "permission denied")),
            Ok(SourceUnit::new("c.txt", "never reached")),
        ];
        let err = pipeline.run(&mut store, input).unwrap_err();

        assert!(matches!(err, Error::Ingestion { ref source_id, .. } if source_id == "b.txt"));
        assert_eq!(store.len(), 1);
        assert_eq!(scanned(&store)[0].source_id, "a.txt");
    }

    #[test]
    fn test_embedder_failure_is_upstream() {
        let mut calls = 0;
        let embedder = FnEmbedder::new(move |_: &str| {
            calls += 1;
            if calls == 2 {
                Err(Error::Embedding("model crashed".to_string()))
            } else {
                Ok(vec![1.0, 0.0])
            }
        });
        let mut pipeline = IngestionPipeline::new(embedder);
        let mut store = MemoryStore::new();

        let err = pipeline
            .run(&mut store, units(&[("a", "x"), ("b", "y"), ("c", "z")]))
            .unwrap_err();

        assert!(err.is_upstream());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_inconsistent_embedder_is_validation_error() {
        let embedder = FnEmbedder::new(|text: &str| Ok(vec![1.0; text.len()]));
        let mut pipeline = IngestionPipeline::new(embedder);
        let mut store = MemoryStore::new();

        let err = pipeline
            .run(&mut store, units(&[("a", "xx"), ("b", "yyy")]))
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rebuild_swaps_on_success() {
        let shared = SharedStore::default();
        let mut pipeline = IngestionPipeline::new(stub());

        let before = shared.snapshot();
        pipeline
            .rebuild(&shared, units(&[("a", "x"), ("b", "y")]))
            .unwrap();

        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_store() {
        let shared = SharedStore::default();
        let mut pipeline = IngestionPipeline::new(stub());
        pipeline
            .rebuild(&shared, units(&[("a", "x"), ("b", "y")]))
            .unwrap();

        let input = vec![
            Ok(SourceUnit::new("c", "z")),
            Err(Error::ingestion("d", "gone")),
        ];
        assert!(pipeline.rebuild(&shared, input).is_err());

        let active = shared.snapshot();
        assert_eq!(active.len(), 2);
        assert_eq!(active.records()[0].source_id, "a");
    }
}
