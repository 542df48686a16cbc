//! Ingestion pipeline orchestration.
//!
//! Drives normalize → chunk → knowledge store for one uploaded file and
//! reports a per-file outcome. A batch fans out across files with
//! bounded concurrency; each file's own pipeline stays strictly ordered.
//! A failing file never aborts the rest of its batch.
//!
//! Extraction operates on the uploaded bytes in memory; no temporary
//! files are created on any path.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::chunk::chunk_units;
use crate::config::Config;
use crate::normalize::normalize;
use crate::store::KnowledgeStore;

/// Outcome of one file in a batch upload, shaped for the upload
/// endpoint's per-file report.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    pub status: String,
    pub chunks: usize,
    pub message: String,
}

impl FileOutcome {
    pub fn success(filename: String, chunks: usize) -> Self {
        Self {
            filename,
            status: "success".to_string(),
            chunks,
            message: format!("ingested {} chunks", chunks),
        }
    }

    pub fn failure(filename: String, message: String) -> Self {
        Self {
            filename,
            status: "error".to_string(),
            chunks: 0,
            message,
        }
    }
}

/// Ingest one file: normalize, chunk, embed, index. Returns the number
/// of chunks written.
///
/// An empty document is a defined non-error outcome: zero chunks are
/// reported, the store is never called, and the anomaly is logged at
/// warn level. Every error is tagged with the originating filename so a
/// batch caller can report per-file failures.
pub async fn process_file(
    store: &KnowledgeStore,
    config: &Config,
    filename: &str,
    bytes: &[u8],
) -> Result<usize> {
    info!(file = filename, size = bytes.len(), "processing file");

    let units =
        normalize(filename, bytes).with_context(|| format!("while processing {}", filename))?;
    let chunks = chunk_units(
        &units,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    if chunks.is_empty() {
        warn!(file = filename, "no chunks produced, nothing to ingest");
        return Ok(0);
    }

    let count = store
        .ingest(&chunks)
        .await
        .with_context(|| format!("while processing {}", filename))?;
    info!(file = filename, chunks = count, "ingested");
    Ok(count)
}

/// Ingest a batch of files with bounded concurrency. Outcomes come back
/// in input order; a failed file is reported in place, never propagated.
pub async fn process_batch(
    store: Arc<KnowledgeStore>,
    config: Arc<Config>,
    files: Vec<(String, Vec<u8>)>,
) -> Vec<FileOutcome> {
    let semaphore = Arc::new(Semaphore::new(config.ingest.max_concurrency));
    let mut set = JoinSet::new();

    for (position, (filename, bytes)) in files.into_iter().enumerate() {
        let store = store.clone();
        let config = config.clone();
        let semaphore = semaphore.clone();
        set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        position,
                        FileOutcome::failure(filename, "ingestion cancelled".to_string()),
                    )
                }
            };
            let outcome = match process_file(&store, &config, &filename, &bytes).await {
                Ok(count) => FileOutcome::success(filename, count),
                Err(e) => {
                    error!(file = %filename, error = %format!("{:#}", e), "ingestion failed");
                    FileOutcome::failure(filename, format!("{:#}", e))
                }
            };
            (position, outcome)
        });
    }

    let mut outcomes: Vec<(usize, FileOutcome)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        if let Ok(entry) = joined {
            outcomes.push(entry);
        }
    }
    outcomes.sort_by_key(|(position, _)| *position);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
