//! In-memory [`VectorIndex`] for tests.
//!
//! Brute-force cosine similarity over everything stored, behind a
//! `std::sync::RwLock`. Call counters let tests assert how often the
//! store was touched (e.g. that a rejected file never reached it).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::models::ScoredChunk;

use super::{IndexedRecord, VectorIndex};

#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Vec<IndexedRecord>>>,
    pub add_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(
        &self,
        collection: &str,
        records: Vec<IndexedRecord>,
    ) -> Result<usize, PipelineError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let count = records.len();
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(records);
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections.read().unwrap();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = records
            .iter()
            .map(|record| ScoredChunk {
                chunk: record.chunk.clone(),
                score: cosine_sim(vector, &record.vector),
            })
            .collect();
        // Ties keep whatever order the sort leaves them in; callers must
        // not rely on tie placement.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}
