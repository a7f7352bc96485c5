use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde::{Deserialize, Serialize};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Local embedding models supported by [`FastEmbedder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// intfloat/multilingual-e5-base, 768 dimensions. Handles the Portuguese corpus.
    #[default]
    MultilingualE5Base,
    /// intfloat/multilingual-e5-small, 384 dimensions
    MultilingualE5Small,
    /// BAAI/bge-small-en-v1.5, 384 dimensions
    BgeSmallEn,
    /// BAAI/bge-large-en-v1.5, 1024 dimensions
    BgeLargeEn,
}

impl ModelKind {
    #[must_use]
    pub fn model_name(self) -> &'static str {
        match self {
            Self::MultilingualE5Base => "intfloat/multilingual-e5-base",
            Self::MultilingualE5Small => "intfloat/multilingual-e5-small",
            Self::BgeSmallEn => "BAAI/bge-small-en-v1.5",
            Self::BgeLargeEn => "BAAI/bge-large-en-v1.5",
        }
    }

    #[must_use]
    pub fn dimension(self) -> usize {
        match self {
            Self::MultilingualE5Base => 768,
            Self::MultilingualE5Small | Self::BgeSmallEn => 384,
            Self::BgeLargeEn => 1024,
        }
    }

    fn fastembed_model(self) -> EmbeddingModel {
        match self {
            Self::MultilingualE5Base => EmbeddingModel::MultilingualE5Base,
            Self::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
            Self::BgeSmallEn => EmbeddingModel::BGESmallENV15,
            Self::BgeLargeEn => EmbeddingModel::BGELargeENV15,
        }
    }

    fn query_text(self, text: &str) -> String {
        match self {
            // E5 models are trained with these role prefixes
            Self::MultilingualE5Base | Self::MultilingualE5Small => format!("query: {text}"),
            // BGE uses a special prompt prefix for queries to improve retrieval
            Self::BgeSmallEn | Self::BgeLargeEn => {
                format!("Represent this sentence for searching relevant passages: {text}")
            }
        }
    }

    fn document_text(self, text: &str) -> String {
        match self {
            Self::MultilingualE5Base | Self::MultilingualE5Small => format!("passage: {text}"),
            Self::BgeSmallEn | Self::BgeLargeEn => text.to_string(),
        }
    }
}

/// Embedder backed by a local ONNX model through fastembed.
///
/// Downloads the model on first use and caches it on disk.
pub struct FastEmbedder {
    model: TextEmbedding,
    kind: ModelKind,
}

impl FastEmbedder {
    /// Load the given model.
    pub fn new(kind: ModelKind) -> Result<Self> {
        let opts = InitOptions::new(kind.fastembed_model()).with_show_download_progress(true);

        TextEmbedding::try_new(opts)
            .map(|model| Self { model, kind })
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        self.kind.model_name()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.kind.dimension())
    }

    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let inputs: Vec<String> = texts.iter().map(|t| self.kind.document_text(t)).collect();

        self.model
            .embed(inputs, None)
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        let query_text = self.kind.query_text(text);

        self.model
            .embed(vec![query_text], None)
            .map_err(|e| Error::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_from_config_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            model: ModelKind,
        }

        let w: Wrapper = toml::from_str(r#"model = "bge-large-en""#).unwrap();
        assert_eq!(w.model, ModelKind::BgeLargeEn);

        let w: Wrapper = toml::from_str(r#"model = "multilingual-e5-small""#).unwrap();
        assert_eq!(w.model, ModelKind::MultilingualE5Small);
    }

    #[test]
    fn test_prefixes() {
        let kind = ModelKind::MultilingualE5Base;
        assert_eq!(kind.query_text("quem?"), "query: quem?");
        assert_eq!(kind.document_text("texto"), "passage: texto");

        let kind = ModelKind::BgeSmallEn;
        assert_eq!(kind.document_text("text"), "text");
        assert!(kind.query_text("who?").ends_with("who?"));
    }

    #[test]
    fn test_default_model() {
        assert_eq!(ModelKind::default(), ModelKind::MultilingualE5Base);
        assert_eq!(ModelKind::default().dimension(), 768);
    }
}
