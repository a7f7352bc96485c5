//! Text embedding
//!
//! The retrieval core never talks to a model directly. It takes any
//! [`Embedder`], so production code plugs in [`FastEmbedder`] (local ONNX
//! models via the fastembed crate) while tests plug in a closure through
//! [`FnEmbedder`].
//!
//! # Usage
//!
//! ```ignore
//! use pingpoli_lib::embed::{Embedder, FastEmbedder, ModelKind};
//!
//! let mut embedder = FastEmbedder::new(ModelKind::MultilingualE5Base)?;
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["Ficha do atleta...", "Resultados..."])?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("Quem é o capitão da equipe?")?;
//! ```

use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Implementations must be deterministic for identical input within one model
/// version. The dimensionality is a property of the model.
pub trait Embedder: Send {
    /// Embed multiple documents for indexing
    ///
    /// Documents may be batched for efficiency.
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    ///
    /// Note: Some models (like BGE) use different prompts for queries vs documents.
    /// This method handles that distinction.
    fn embed_query(&mut self, text: &str) -> Result<Embedding>;

    /// Embed a single document
    fn embed_document(&mut self, text: &str) -> Result<Embedding> {
        self.embed_documents(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }

    /// Returns the embedding dimension, if known up front
    fn dimension(&self) -> Option<usize>;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

/// Adapts a plain function into an [`Embedder`].
///
/// Queries and documents go through the same function.
///
/// ```ignore
/// let embedder = FnEmbedder::new(|text: &str| Ok(vec![text.len() as f32, 1.0]));
/// ```
pub struct FnEmbedder<F> {
    f: F,
    name: String,
}

impl<F> FnEmbedder<F>
where
    F: FnMut(&str) -> Result<Embedding> + Send,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "fn".to_string(),
        }
    }

    /// Set the name reported by [`Embedder::model_name`].
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> Embedder for FnEmbedder<F>
where
    F: FnMut(&str) -> Result<Embedding> + Send,
{
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| (self.f)(text)).collect()
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        (self.f)(text)
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

mod onnx;
pub use onnx::*;
