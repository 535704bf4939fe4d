//! Embedding generation
//!
//! This module provides an abstraction over embedding services with:
//! - A trait for different embedding backends
//! - An HTTP backend
//! - Lossy batch processing: a failed batch is retried, then skipped, so one
//!   bad batch degrades coverage instead of aborting a run

mod http_backend;

pub use http_backend::*;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Whether texts are embedded as indexed documents or as search queries.
/// Embedding models may treat the two asymmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            InputType::Document => "search_document",
            InputType::Query => "search_query",
        }
    }
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, order-preserving
    async fn embed(&self, texts: Vec<String>, input_type: InputType) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    let api_key = config.embedding_api_key()?;
    let embedder = HttpEmbedder::new(&config.embedding, api_key)?;
    Ok(Box::new(embedder))
}

/// Embed texts in fixed-size batches. Each batch is retried up to
/// `max_retries` times with backoff, then skipped; skipped texts yield `None`
/// at their position. Returns the per-text results and the number of batches
/// that were skipped.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    input_type: InputType,
    batch_size: usize,
    max_retries: usize,
) -> (Vec<Option<Vec<f32>>>, usize) {
    let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
    let mut failed_batches = 0;

    for batch in texts.chunks(batch_size.max(1)) {
        match embed_batch_with_retry(embedder, batch, input_type, max_retries).await {
            Ok(vectors) => results.extend(vectors.into_iter().map(Some)),
            Err(e) => {
                warn!(
                    batch_len = batch.len(),
                    "Skipping failed embedding batch: {}", e
                );
                failed_batches += 1;
                results.extend(std::iter::repeat_with(|| None).take(batch.len()));
            }
        }
    }

    (results, failed_batches)
}

async fn embed_batch_with_retry(
    embedder: &dyn Embedder,
    batch: &[String],
    input_type: InputType,
    max_retries: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut attempt = 0;
    loop {
        match embedder.embed(batch.to_vec(), input_type).await {
            Ok(vectors) => return Ok(vectors),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                let backoff = Duration::from_millis(500 * attempt as u64);
                warn!(
                    attempt,
                    "Embedding batch failed ({}), retrying in {:?}", e, backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that fails a fixed set of leading calls, then succeeds
    struct FlakyEmbedder {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(
            &self,
            texts: Vec<String>,
            _input_type: InputType,
        ) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(Error::Embedding("transient".to_string()));
            }
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let embedder = FlakyEmbedder { calls: AtomicUsize::new(0), failures: 0 };
        let (results, failed) = embed_in_batches(&embedder, &texts(7), InputType::Document, 3, 0).await;

        assert_eq!(failed, 0);
        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.is_some()));
        // 3 + 3 + 1
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_is_retried_then_recovers() {
        let embedder = FlakyEmbedder { calls: AtomicUsize::new(0), failures: 1 };
        let (results, failed) = embed_in_batches(&embedder, &texts(2), InputType::Document, 4, 2).await;

        assert_eq!(failed, 0);
        assert!(results.iter().all(|r| r.is_some()));
    }

    #[tokio::test]
    async fn test_exhausted_retries_skip_batch_only() {
        // First batch fails through all retries; second batch succeeds
        let embedder = FlakyEmbedder { calls: AtomicUsize::new(0), failures: 2 };
        let (results, failed) = embed_in_batches(&embedder, &texts(4), InputType::Document, 2, 1).await;

        assert_eq!(failed, 1);
        assert_eq!(results.len(), 4);
        assert!(results[0].is_none());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
        assert!(results[3].is_some());
    }

    #[test]
    fn test_input_type_wire_strings() {
        assert_eq!(InputType::Document.as_wire_str(), "search_document");
        assert_eq!(InputType::Query.as_wire_str(), "search_query");
    }
}
