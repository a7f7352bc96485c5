//! Top-k similarity search
//!
//! Linear scan over an [`EmbeddingStore`] with a bounded candidate heap:
//!
//! ```text
//! scan ──> cosine(query, doc) ──> min-heap (≤ k) ──> sort desc ──> ScoredMatch
//!                                   │
//!                        evict min when a better one arrives
//! ```
//!
//! Working memory is O(k) whatever the corpus size, and only the texts of
//! records that enter the heap are cloned.
//!
//! Equal similarities are ordered by scan position, earlier first, and a
//! newcomer that merely ties the current minimum does not evict it. Which of
//! two tied records survives therefore depends on the store's scan order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::{debug, warn};

use crate::store::EmbeddingStore;
use crate::{Error, Result};

/// A search result with similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    /// Identifier of the matched record
    pub source_id: String,
    /// The matched document body
    pub text: String,
    /// Cosine similarity in [-1.0, 1.0] (higher is more similar).
    /// `f32::NEG_INFINITY` for zero-length vectors.
    pub similarity: f32,
}

/// Find the `k` records most similar to `query`, best first.
///
/// Aborts with [`Error::DimensionMismatch`] on the first stored embedding
/// whose length differs from the query, since that means the store is
/// corrupted or was built by another model.
pub fn top_k<S>(store: &S, query: &[f32], k: usize) -> Result<Vec<ScoredMatch>>
where
    S: EmbeddingStore + ?Sized,
{
    if k == 0 {
        return Ok(Vec::new());
    }
    if query.is_empty() {
        return Err(Error::InvalidInput("query embedding is empty".to_string()));
    }
    if query.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidInput(
            "query embedding holds a non-finite value".to_string(),
        ));
    }

    let query_norm = norm(query);
    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);
    let mut scanned = 0;

    for (seq, record) in store.scan()?.enumerate() {
        let record = record?;
        if record.embedding.len() != query.len() {
            return Err(Error::DimensionMismatch {
                expected: record.embedding.len(),
                actual: query.len(),
            });
        }
        scanned += 1;

        let similarity = cosine_with_norm(query, query_norm, &record.embedding);
        if similarity == f32::NEG_INFINITY {
            warn!(source_id = %record.source_id, "zero-norm embedding ranks last");
        }

        if heap.len() < k {
            heap.push(Reverse(Candidate::new(similarity, seq, &record.source_id, &record.text)));
        } else if heap
            .peek()
            .is_some_and(|Reverse(min)| similarity > min.similarity)
        {
            heap.pop();
            heap.push(Reverse(Candidate::new(similarity, seq, &record.source_id, &record.text)));
        }
    }

    let mut candidates: Vec<Candidate> = heap.into_iter().map(|Reverse(c)| c).collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));

    debug!(scanned, k, returned = candidates.len(), "top-k search");
    Ok(candidates.into_iter().map(Candidate::into_match).collect())
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction. If either
/// vector has zero length the similarity is undefined; this returns
/// `f32::NEG_INFINITY` so such records always lose.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    cosine_with_norm(a, norm(a), b)
}

// Accumulates in f64: any finite f32 squares without overflow or underflow.
fn cosine_with_norm(a: &[f32], norm_a: f64, b: &[f32]) -> f32 {
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::NEG_INFINITY;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    ((dot / norm_a / norm_b) as f32).clamp(-1.0, 1.0)
}

fn norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Heap entry. Greater means more relevant: higher similarity, then earlier
/// scan position.
#[derive(Debug)]
struct Candidate {
    similarity: f32,
    seq: usize,
    source_id: String,
    text: String,
}

impl Candidate {
    fn new(similarity: f32, seq: usize, source_id: &str, text: &str) -> Self {
        Self {
            similarity,
            seq,
            source_id: source_id.to_string(),
            text: text.to_string(),
        }
    }

    fn into_match(self) -> ScoredMatch {
        ScoredMatch {
            source_id: self.source_id,
            text: self.text,
            similarity: self.similarity,
        }
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}
