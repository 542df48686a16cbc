//! Knowledge store: embedding + vector index behind one adapter.
//!
//! The [`VectorIndex`] trait abstracts the backing vector database so the
//! pipeline never talks to a concrete store directly — the HTTP-backed
//! [`qdrant::QdrantIndex`] serves production, the brute-force
//! [`memory::MemoryIndex`] serves tests. [`KnowledgeStore`] composes an
//! [`Embedder`] with an index and a collection name and exposes the two
//! operations the rest of the pipeline uses: `ingest` and `search`.
//!
//! Records are write-once. There is no update or delete path;
//! re-ingesting the same content adds new records, and retrieval
//! de-duplicates by relevance ranking rather than identity.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::models::{Chunk, ScoredChunk};

/// A chunk plus its embedding vector and store-side identity, ready to
/// be written into a collection.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
    /// Unix timestamp of ingestion, stored in the record payload.
    pub ingested_at: i64,
}

/// Abstract vector database operations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write records into a collection, creating the collection on first
    /// use. Returns the number of records written.
    async fn add(
        &self,
        collection: &str,
        records: Vec<IndexedRecord>,
    ) -> Result<usize, PipelineError>;

    /// Nearest-neighbour lookup. Returns up to `k` chunks ordered by
    /// descending similarity; ordering among equal scores is
    /// backend-native.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError>;
}

/// The knowledge store the pipeline reads and writes.
pub struct KnowledgeStore {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    collection: String,
    batch_size: usize,
}

impl KnowledgeStore {
    pub fn new(
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        collection: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Build the production store from configuration: the configured
    /// embedding provider over a Qdrant-compatible REST index.
    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        let embedder = crate::embedding::create_embedder(&config.embedding)?;
        let index = Box::new(qdrant::QdrantIndex::new(&config.store, config.embedding.dims)?);
        Ok(Self::new(
            embedder,
            index,
            config.store.collection.clone(),
            config.embedding.batch_size,
        ))
    }

    /// Embed and index a file's chunks. All-or-nothing: an embedding or
    /// write failure fails the whole call and nothing counts as
    /// ingested, so a document is never half-indexed.
    pub async fn ingest(&self, chunks: &[Chunk]) -> Result<usize, PipelineError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.embedder.embed(&texts).await?);
        }
        if vectors.len() != chunks.len() {
            return Err(PipelineError::EmbeddingFailure(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let records: Vec<IndexedRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                chunk: chunk.clone(),
                ingested_at: now,
            })
            .collect();

        self.index.add(&self.collection, records).await
    }

    /// Embed the query text and return up to `k` chunks by descending
    /// similarity.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PipelineError::EmbeddingFailure("empty embedding response".to_string())
            })?;
        self.index.search(&self.collection, &vector, k).await
    }
}
