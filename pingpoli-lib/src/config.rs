//! Configuration file support.
//!
//! Settings live in `pingpoli.toml`. Every section is optional and falls back
//! to its defaults, so an absent file is a valid configuration:
//!
//! ```toml
//! [store]
//! path = "data/embeddings.jsonl"
//!
//! [ingest]
//! source_dir = "data/raw"
//!
//! [retrieval]
//! k = 5
//!
//! [embedding]
//! model = "multilingual-e5-base"
//!
//! [completion]
//! model = "llama-3.3-70b-versatile"
//! temperature = 0.7
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::complete::{self, GroqConfig};
use crate::embed::ModelKind;
use crate::retrieve::DEFAULT_K;
use crate::{Error, Result};

/// The default config file name.
pub const CONFIG_FILE: &str = "pingpoli.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
}

/// Where the embedding store lives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/embeddings.jsonl"),
        }
    }
}

/// Where source documents are read from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data/raw"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Documents injected into each prompt.
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: ModelKind,
}

/// Completion service settings. The API key itself is never stored here.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: complete::DEFAULT_MODEL.to_string(),
            temperature: complete::DEFAULT_TEMPERATURE,
            base_url: complete::DEFAULT_API_BASE.to_string(),
            api_key_env: complete::DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl CompletionConfig {
    /// Build the client config, reading the key from the environment.
    pub fn groq(&self) -> Result<GroqConfig> {
        Ok(GroqConfig::from_env(&self.api_key_env)?
            .with_model(&self.model)
            .with_base_url(&self.base_url)
            .with_temperature(self.temperature))
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.k == 0 {
            return Err(Error::Config("retrieval.k must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config(format!(
                "completion.temperature must be within 0..=2, got {}",
                self.completion.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("data/embeddings.jsonl"));
        assert_eq!(config.ingest.source_dir, PathBuf::from("data/raw"));
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.embedding.model, ModelKind::MultilingualE5Base);
        assert_eq!(config.completion.model, "llama-3.3-70b-versatile");
        assert_eq!(config.completion.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[retrieval]
k = 3

[embedding]
model = "bge-small-en"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.embedding.model, ModelKind::BgeSmallEn);
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.completion, CompletionConfig::default());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config.store.path = PathBuf::from("/var/lib/pingpoli/store.jsonl");
        config.completion.temperature = 0.2;

        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[retrieval\nk = ").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[retrieval]\nk = 0\n").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        for temperature in ["-0.1", "2.5", "nan"] {
            let config: Config =
                toml::from_str(&format!("[completion]\ntemperature = {temperature}\n")).unwrap();
            let err = config.validate().unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains("temperature")));
        }

        let config: Config = toml::from_str("[completion]\ntemperature = 2.0\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_model_rejected() {
        let err = toml::from_str::<Config>("[embedding]\nmodel = \"gpt-embed\"\n").unwrap_err();
        assert!(err.to_string().contains("gpt-embed"));
    }
}
