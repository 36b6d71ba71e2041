//! Semantic job matcher: free-text query in, ranked job records out

use crate::config::Config;
use crate::error::{InterviewError, Result};
use crate::processing::embeddings::{normalize, Embedder, Model2VecEmbedder};
use crate::processing::index::VectorIndex;
use crate::processing::records::{JobRecord, JobRecordStore};
use log::{debug, info};

/// Read-only view over a fixed index. Safe to share across threads.
pub struct JobMatcher<E: Embedder> {
    embedder: E,
    index: VectorIndex,
    records: JobRecordStore,
}

impl JobMatcher<Model2VecEmbedder> {
    /// Load the index, record table and embedding model named by the config.
    pub fn load(config: &Config) -> Result<Self> {
        let index = VectorIndex::load(&config.index_path())?;
        let records = JobRecordStore::load(&config.records_path())?;

        let model_path = config.embedding_model_path();
        let embedder = Model2VecEmbedder::load(&model_path)
            .map_err(|e| InterviewError::index_unavailable("embedding model", e))?;

        Self::from_parts(embedder, index, records)
    }
}

impl<E: Embedder> JobMatcher<E> {
    /// Assemble a matcher, checking that index and table describe the same rows.
    pub fn from_parts(embedder: E, index: VectorIndex, records: JobRecordStore) -> Result<Self> {
        if index.len() != records.len() {
            return Err(InterviewError::index_unavailable(
                "index",
                format!(
                    "index has {} rows but the record table has {}",
                    index.len(),
                    records.len()
                ),
            ));
        }

        if !index.is_empty() {
            let sample = embedder.embed("dimension check");
            if sample.len() != index.dimension() {
                return Err(InterviewError::index_unavailable(
                    "embedding model",
                    format!(
                        "model {} produces {}-d vectors but the index holds {}-d vectors",
                        embedder.name(),
                        sample.len(),
                        index.dimension()
                    ),
                ));
            }
        }

        info!(
            "Job matcher ready: {} records, {} dimensions, model {}",
            records.len(),
            index.dimension(),
            embedder.name()
        );

        Ok(Self {
            embedder,
            index,
            records,
        })
    }

    /// Top `k` jobs for `query`, most similar first.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<JobRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InterviewError::InvalidQuery("query is empty".to_string()));
        }
        if k == 0 {
            return Err(InterviewError::InvalidQuery("k must be at least 1".to_string()));
        }

        let mut embedding = self.embedder.embed(query);
        normalize(&mut embedding);

        let hits = self.index.search(&embedding, k)?;

        let results = hits
            .into_iter()
            .map(|hit| {
                self.records
                    .get(hit.position)
                    .map(|row| JobRecord::from_row(row, hit.score))
                    .ok_or_else(|| {
                        InterviewError::index_unavailable(
                            "records",
                            format!("no record at row {}", hit.position),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Query '{}' matched {} jobs", query, results.len());
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
