//! Query-time retrieval
//!
//! Combines an embedder with a read-only store into the API the answer layer
//! consumes.
//!
//! # Usage
//!
//! ```ignore
//! use pingpoli_lib::retrieve::{RetrievalService, DEFAULT_K};
//!
//! let mut service = RetrievalService::new(embedder);
//! let texts = service.retrieve(&store, "Quem é o capitão?", DEFAULT_K)?;
//!
//! // Full RAG round trip
//! let answer = service.answer(&store, "Quem é o capitão?", DEFAULT_K, &completer).await?;
//! ```

use tracing::{debug, warn};

use crate::complete::Completer;
use crate::embed::Embedder;
use crate::search::{top_k, ScoredMatch};
use crate::store::EmbeddingStore;
use crate::Result;

/// Number of documents retrieved when the caller has no preference.
pub const DEFAULT_K: usize = 5;

/// Placed between retrieved documents in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Embeds queries and looks them up in a store.
///
/// The store is passed per call, so the service works equally over a
/// [`JsonlStore`](crate::store::JsonlStore) or a
/// [`SharedStore`](crate::store::SharedStore) snapshot.
pub struct RetrievalService<E: Embedder> {
    embedder: E,
}

impl<E: Embedder> RetrievalService<E> {
    #[must_use]
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    /// Texts of the `k` most relevant documents, best first.
    pub fn retrieve<S>(&mut self, store: &S, query: &str, k: usize) -> Result<Vec<String>>
    where
        S: EmbeddingStore + ?Sized,
    {
        Ok(self
            .search(store, query, k)?
            .into_iter()
            .map(|m| m.text)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps identifiers and scores.
    pub fn search<S>(&mut self, store: &S, query: &str, k: usize) -> Result<Vec<ScoredMatch>>
    where
        S: EmbeddingStore + ?Sized,
    {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query)?;
        let matches = top_k(store, &query_embedding, k)?;

        debug!(
            k,
            matched = matches.len(),
            best = ?matches.first().map(|m| m.similarity),
            "retrieved"
        );
        Ok(matches)
    }

    /// Retrieved texts joined into one context block.
    pub fn context<S>(&mut self, store: &S, query: &str, k: usize) -> Result<String>
    where
        S: EmbeddingStore + ?Sized,
    {
        Ok(self.retrieve(store, query, k)?.join(CONTEXT_SEPARATOR))
    }

    /// Answer `question` from the documents most relevant to it.
    ///
    /// One completion call, no retry.
    pub async fn answer<S, C>(
        &mut self,
        store: &S,
        question: &str,
        k: usize,
        completer: &C,
    ) -> Result<String>
    where
        S: EmbeddingStore + ?Sized,
        C: Completer + ?Sized,
    {
        let context = self.context(store, question, k)?;
        if context.is_empty() {
            warn!("no context retrieved, answering without it");
        }

        completer.complete(&build_prompt(&context, question)).await
    }

    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn embedder_mut(&mut self) -> &mut E {
        &mut self.embedder
    }
}

/// Wrap retrieved context and the user's question into the completion prompt.
#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Você é um assistente de IA especialista na equipe PingPoli. \
         Use o CONTEXTO fornecido abaixo para responder à PERGUNTA do usuário \
         de forma precisa e factual.\n\n\
         CONTEXTO:\n{context}\n\n\
         PERGUNTA:\n{question}\n"
    )
}
