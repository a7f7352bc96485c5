//! PingPoli - RAG library for the PingPoli team knowledge base
//!
//! # Architecture
//!
//! ```text
//! SourceDir -> IngestionPipeline -> Embedder -> EmbeddingStore
//!                                                   |
//! Question -> Embedder -> top_k (bounded heap) <----+
//!                             |
//!                      context -> Completer -> Answer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pingpoli_lib::{
//!     embed::{FastEmbedder, ModelKind},
//!     ingest::{IngestionPipeline, SourceDir},
//!     retrieve::RetrievalService,
//!     store::JsonlStore,
//! };
//!
//! // Rebuild the store from a directory of documents
//! let mut pipeline = IngestionPipeline::new(FastEmbedder::new(ModelKind::default())?);
//! let mut store = JsonlStore::staged("data/embeddings.jsonl")?;
//! pipeline.run(&mut store, SourceDir::open("data/raw")?)?;
//! let store = store.commit()?;
//!
//! // Retrieve context for a question
//! let mut service = RetrievalService::new(pipeline.into_embedder());
//! let texts = service.retrieve(&store, "Quem é o capitão?", 5)?;
//! ```

pub mod complete;
pub mod config;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod retrieve;
pub mod search;
pub mod store;

pub use error::{Error, Result};
