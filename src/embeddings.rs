use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Maximum number of inputs sent in one embeddings request
const MAX_BATCH_SIZE: usize = 1000;

/// Configuration for the OpenAI embeddings API
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OpenAiConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = env::var("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        Ok(OpenAiConfig {
            api_key,
            base_url,
            model,
        })
    }
}

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// Client for the OpenAI embeddings endpoint
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAiClient { config, client }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Embed a batch of document texts, preserving input order
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            debug!("Embedding batch of {} texts", batch.len());
            let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let mut batch_embeddings = self.request_embeddings(&inputs).await?;
            embeddings.append(&mut batch_embeddings);
        }

        Ok(embeddings)
    }

    /// Embed a single query text
    pub async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.request_embeddings(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned for query"))
    }

    async fn request_embeddings(&self, inputs: &[&str]) -> Result<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: inputs,
        };

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Embeddings request failed: {} {}",
                status,
                error_text
            ));
        }

        let mut response_data: EmbeddingResponse = response.json().await?;

        if response_data.data.len() != inputs.len() {
            return Err(anyhow::anyhow!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                response_data.data.len()
            ));
        }

        response_data.data.sort_by_key(|d| d.index);

        Ok(response_data
            .data
            .into_iter()
            .map(|d| Embedding { values: d.embedding })
            .collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
