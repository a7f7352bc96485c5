//! Language-model completion
//!
//! The retrieval core only needs "prompt in, text out". Failures are returned
//! as [`Error::Completion`](crate::Error::Completion) and never retried here.

use async_trait::async_trait;

use crate::Result;

/// Trait for completion backends
#[async_trait]
pub trait Completer: Send + Sync {
    /// Send one prompt and return the generated text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

mod groq;

pub use groq::*;
