//! Embedding storage backends
//!
//! # Storage Model
//!
//! Each stored item is an [`EmbeddingRecord`]:
//! - `source_id`: where the text came from (the file name during ingestion)
//! - `text`: the document body
//! - `embedding`: the vector representation
//!
//! Stores are append-only between full rebuilds. Every embedding in a store
//! has the same dimensionality, fixed by the first record inserted after a
//! `clear()`.
//!
//! # Usage
//!
//! ```ignore
//! use pingpoli_lib::store::{EmbeddingRecord, EmbeddingStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! store.insert(EmbeddingRecord::new("a.txt", "hello", vec![1.0, 0.0]))?;
//!
//! for record in store.scan()? {
//!     println!("{}", record?.source_id);
//! }
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::embed::Embedding;
use crate::{Error, Result};

/// One stored document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Source identifier, unique per ingestion run
    pub source_id: String,
    /// The document body
    pub text: String,
    /// The vector representation of `text`
    pub embedding: Embedding,
}

impl EmbeddingRecord {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            embedding,
        }
    }
}

/// A lazy traversal over every record in a store.
///
/// Durable backends can fail mid-read, so each item is a `Result`. In-memory
/// backends lend their records without cloning.
pub type Scan<'a> = Box<dyn Iterator<Item = Result<Cow<'a, EmbeddingRecord>>> + 'a>;

/// Trait for embedding storage backends
pub trait EmbeddingStore: Send + Sync {
    /// Remove all records. Idempotent.
    ///
    /// Also forgets the fixed dimensionality.
    fn clear(&mut self) -> Result<()>;

    /// Append one record
    ///
    /// Fails with [`Error::Validation`] if the embedding is empty, holds a
    /// non-finite value, or disagrees in length with the stored records.
    fn insert(&mut self, record: EmbeddingRecord) -> Result<()>;

    /// Traverse all records
    ///
    /// Each call starts a fresh traversal of the current committed state.
    /// No ordering is guaranteed between calls.
    fn scan(&self) -> Result<Scan<'_>>;

    /// Get total number of stored records
    fn len(&self) -> usize;

    /// Check if store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality shared by the stored embeddings, `None` when empty
    fn dimension(&self) -> Option<usize>;
}

/// Check a record against the invariants every store enforces on insert.
pub(crate) fn validate_record(record: &EmbeddingRecord, dimension: Option<usize>) -> Result<()> {
    if record.embedding.is_empty() {
        return Err(Error::Validation(format!(
            "{}: embedding is empty",
            record.source_id
        )));
    }

    if let Some(pos) = record.embedding.iter().position(|x| !x.is_finite()) {
        return Err(Error::Validation(format!(
            "{}: embedding holds a non-finite value at index {pos}",
            record.source_id
        )));
    }

    match dimension {
        Some(expected) if expected != record.embedding.len() => Err(Error::Validation(format!(
            "{}: embedding has {} dimensions, store holds {expected}",
            record.source_id,
            record.embedding.len()
        ))),
        _ => Ok(()),
    }
}

mod jsonl;
mod memory;
mod shared;

pub use jsonl::*;
pub use memory::*;
pub use shared::*;
