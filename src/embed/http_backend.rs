//! HTTP embedding backend speaking a Cohere-style embed API

use super::{Embedder, InputType};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    texts: Vec<String>,
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let mut base = Url::parse(&config.url)?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base
            .join("v1/embed")
            .map_err(|e| Error::Config(format!("Invalid embedding URL '{}': {}", config.url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    fn validate(&self, embeddings: &[Vec<f32>], expected_count: usize) -> Result<()> {
        if embeddings.len() != expected_count {
            return Err(Error::Embedding(format!(
                "Embedding service returned {} vectors for {} texts",
                embeddings.len(),
                expected_count
            )));
        }

        if let Some(mismatch) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model,
                self.dimension,
                mismatch.len()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>, input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request = EmbedRequest {
            model: self.model.clone(),
            texts,
            input_type: input_type.as_wire_str(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Embedding service returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        self.validate(&parsed.embeddings, expected)?;
        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer, dimension: usize) -> HttpEmbedder {
        let config = EmbeddingConfig {
            url: server.uri(),
            api_key_env: "TEST_EMBED_KEY".to_string(),
            model: "embed-english-v3.0".to_string(),
            dimension,
            batch_size: 96,
            timeout_secs: 5,
            max_retries: 0,
        };
        HttpEmbedder::new(&config, "secret-key".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_input_type() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .and(header("authorization", "Bearer secret-key"))
            .and(body_partial_json(json!({
                "model": "embed-english-v3.0",
                "input_type": "search_query",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.1, 0.2, 0.3]],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = embedder_for(&server, 3);
        let vectors = embedder
            .embed(vec!["what is a humanoid".to_string()], InputType::Query)
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_dimension() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.1, 0.2]],
            })))
            .mount(&server)
            .await;

        let embedder = embedder_for(&server, 3);
        let err = embedder
            .embed(vec!["text".to_string()], InputType::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Embedding(ref m) if m.contains("dimension mismatch")));
    }

    #[tokio::test]
    async fn test_embed_rejects_count_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.1, 0.2, 0.3]],
            })))
            .mount(&server)
            .await;

        let embedder = embedder_for(&server, 3);
        let err = embedder
            .embed(
                vec!["one".to_string(), "two".to_string()],
                InputType::Document,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_surfaces_service_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let embedder = embedder_for(&server, 3);
        let err = embedder
            .embed(vec!["text".to_string()], InputType::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Embedding(ref m) if m.contains("429")));
    }

    #[test]
    fn test_endpoint_keeps_base_url_path() {
        let mut config = EmbeddingConfig::default();

        config.url = "http://127.0.0.1:9/compat".to_string();
        let embedder = HttpEmbedder::new(&config, "k".to_string()).unwrap();
        assert_eq!(
            embedder.endpoint.as_str(),
            "http://127.0.0.1:9/compat/v1/embed"
        );

        config.url = "http://127.0.0.1:9".to_string();
        let embedder = HttpEmbedder::new(&config, "k".to_string()).unwrap();
        assert_eq!(embedder.endpoint.as_str(), "http://127.0.0.1:9/v1/embed");
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let server = MockServer::start().await;
        // No mock mounted: a request would fail
        let embedder = embedder_for(&server, 3);
        let vectors = embedder.embed(Vec::new(), InputType::Document).await.unwrap();
        assert!(vectors.is_empty());
    }
}
