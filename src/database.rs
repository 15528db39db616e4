use crate::chunking::TextChunk;
use crate::embeddings::Embedding;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParams,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::env;

/// Default collection holding the indexed documents
pub const DEFAULT_COLLECTION: &str = "my_syvilledesigns_collection";

/// Points sent per upsert request
const UPSERT_BATCH_SIZE: usize = 256;

/// Configuration for Qdrant
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let url = env::var("QDRANT_URL")?;
        let api_key = env::var("QDRANT_API_KEY").ok();

        Ok(QdrantConfig { url, api_key })
    }
}

/// A retrieved chunk together with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub chunk_index: Option<i64>,
    pub score: f32,
}

/// Storage side of the engine: one collection of chunk vectors
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this store writes to
    fn collection(&self) -> &str;

    /// Drop the collection if present and create it empty
    async fn recreate_collection(&self, vector_size: u64) -> Result<()>;

    /// Store chunks with their embeddings, one point per chunk
    async fn store_chunks(
        &self,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> Result<()>;

    /// Return the `limit` chunks closest to `query_embedding`
    async fn search(
        &self,
        query_embedding: Embedding,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>>;
}

/// Client for one Qdrant collection
pub struct QdrantClient {
    client: Qdrant,
    collection: String,
}

impl QdrantClient {
    /// Create a new Qdrant client bound to `collection`
    pub fn new(config: QdrantConfig, collection: &str) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder.build()?;

        Ok(QdrantClient {
            client,
            collection: collection_name(collection),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.collection)
            .await
            .with_context(|| format!("Failed to check collection {}", self.collection))
    }

    /// Create the collection with cosine distance
    pub async fn create_collection(&self, vector_size: u64) -> Result<()> {
        let create_collection = CreateCollectionBuilder::new(self.collection.clone())
            .vectors_config(VectorParams {
                size: vector_size,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .with_context(|| format!("Failed to create collection {}", self.collection))?;

        Ok(())
    }

    /// Delete the collection
    pub async fn delete_collection(&self) -> Result<()> {
        self.client
            .delete_collection(self.collection.clone())
            .await
            .with_context(|| format!("Failed to delete collection {}", self.collection))?;

        Ok(())
    }

    /// Drop the collection if present and create it empty
    pub async fn recreate_collection(&self, vector_size: u64) -> Result<()> {
        if self.collection_exists().await? {
            debug!("Dropping existing collection {}", self.collection);
            self.delete_collection().await?;
        }
        self.create_collection(vector_size).await
    }

    /// Store chunks in the collection, one point per chunk
    pub async fn store_chunks(
        &self,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(anyhow::anyhow!(
                "Got {} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            ));
        }

        let mut points = Vec::with_capacity(chunks.len());
        for (idx, (chunk, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            points.push(PointStruct::new(
                idx as u64,
                embedding.values,
                chunk_payload(&chunk, idx)?,
            ));
        }

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let upsert_request =
                UpsertPointsBuilder::new(self.collection.clone(), batch.to_vec()).wait(true);

            self.client
                .upsert_points(upsert_request)
                .await
                .with_context(|| {
                    format!("Failed to upsert points in collection {}", self.collection)
                })?;
        }

        Ok(())
    }

    /// Search for the `limit` chunks closest to `query_embedding`
    pub async fn search(
        &self,
        query_embedding: Embedding,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>> {
        let search_request =
            SearchPointsBuilder::new(self.collection.clone(), query_embedding.values, limit)
                .with_payload(true);

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .with_context(|| format!("Failed to search collection {}", self.collection))?;

        Ok(search_response
            .result
            .into_iter()
            .filter_map(scored_chunk)
            .collect())
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    fn collection(&self) -> &str {
        QdrantClient::collection(self)
    }

    async fn recreate_collection(&self, vector_size: u64) -> Result<()> {
        QdrantClient::recreate_collection(self, vector_size).await
    }

    async fn store_chunks(
        &self,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> Result<()> {
        QdrantClient::store_chunks(self, chunks, embeddings).await
    }

    async fn search(
        &self,
        query_embedding: Embedding,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>> {
        QdrantClient::search(self, query_embedding, limit).await
    }
}

fn chunk_payload(chunk: &TextChunk, idx: usize) -> Result<Payload> {
    let payload = Payload::try_from(json!({
        "text": chunk.text,
        "document_id": chunk.document_id,
        "start_position": chunk.start_position,
        "chunk_index": idx,
    }))?;

    Ok(payload)
}

/// Convert a search hit back into a chunk; hits without text are dropped
fn scored_chunk(point: ScoredPoint) -> Option<ScoredChunk> {
    let payload = point.payload;
    let text = payload.get("text")?.as_str()?.to_string();

    let document_id = payload
        .get("document_id")
        .and_then(|v| v.as_str())
        .cloned()
        .unwrap_or_default();

    let start_position = payload
        .get("start_position")
        .and_then(|v| v.as_integer())
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0);

    let chunk_index = payload.get("chunk_index").and_then(|v| v.as_integer());

    Some(ScoredChunk {
        chunk: TextChunk {
            token_count: crate::chunking::estimate_token_count(&text),
            text,
            document_id,
            start_position,
        },
        chunk_index,
        score: point.score,
    })
}

/// Normalize a collection name: non-alphanumerics become underscores, lower-cased
pub fn collection_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}
