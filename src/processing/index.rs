//! Flat inner-product index over unit-length job embeddings
//!
//! Every row is normalized when the index is built, so for a normalized query
//! the inner product is the cosine similarity. The index is stored as a single
//! F32 safetensors tensor named `embeddings` with shape `[rows, dim]`.

use crate::error::{InterviewError, Result};
use crate::processing::embeddings::{normalize, Embedder};
use crate::processing::records::JobRow;
use indicatif::ProgressBar;
use log::{debug, info};
use ndarray::{Array2, ArrayView1};
use safetensors::tensor::{Dtype, SafeTensors, TensorView};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

const TENSOR_NAME: &str = "embeddings";
const BUILD_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub struct VectorIndex {
    matrix: Array2<f32>,
}

/// A single nearest-neighbour hit: row position and similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: usize,
    pub score: f32,
}

impl VectorIndex {
    /// Build from raw vectors. Rows are normalized; all must share one width.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let rows = vectors.len();
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);

        let mut flat = Vec::with_capacity(rows * dim);
        for (i, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(InterviewError::Embedding(format!(
                    "Row {} has dimension {}, expected {}",
                    i,
                    vector.len(),
                    dim
                )));
            }
            normalize(&mut vector);
            flat.extend(vector);
        }

        let matrix = Array2::from_shape_vec((rows, dim), flat)
            .map_err(|e| InterviewError::Embedding(format!("Invalid index shape: {}", e)))?;
        Ok(Self { matrix })
    }

    /// Embed every row's title and description and index the result.
    pub fn build<E: Embedder + ?Sized>(
        embedder: &E,
        rows: &[JobRow],
        progress: Option<&ProgressBar>,
    ) -> Result<Self> {
        let mut vectors = Vec::with_capacity(rows.len());

        for batch in rows.chunks(BUILD_BATCH) {
            let texts: Vec<String> = batch.iter().map(JobRow::embedding_text).collect();
            vectors.extend(embedder.embed_batch(&texts));
            if let Some(pb) = progress {
                pb.inc(batch.len() as u64);
            }
        }

        info!("Embedded {} job rows with {}", vectors.len(), embedder.name());
        Self::from_vectors(vectors)
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Up to `k` best rows for an already-normalized query, best first.
    /// Equal scores keep row order, so results are stable across calls.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension() {
            return Err(InterviewError::Embedding(format!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension()
            )));
        }

        let scores = self.matrix.dot(&ArrayView1::from(query));

        let mut hits: Vec<Hit> = scores
            .iter()
            .enumerate()
            .map(|(position, &score)| Hit { position, score })
            .collect();

        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.position.cmp(&b.position),
            other => other,
        });
        hits.truncate(k);

        debug!("Index search returned {} hits", hits.len());
        Ok(hits)
    }

    pub fn save(&self, path: &Path, model_name: &str) -> Result<()> {
        let data: Vec<u8> = self.matrix.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, vec![self.len(), self.dimension()], &data)
            .map_err(|e| InterviewError::Embedding(format!("Failed to build index tensor: {}", e)))?;

        let mut metadata = HashMap::new();
        metadata.insert("embedding_model".to_string(), model_name.to_string());
        metadata.insert("rows".to_string(), self.len().to_string());

        let bytes = safetensors::tensor::serialize([(TENSOR_NAME, view)], &Some(metadata))
            .map_err(|e| InterviewError::Embedding(format!("Failed to serialize index: {}", e)))?;

        std::fs::write(path, bytes)?;
        info!("Saved index with {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| InterviewError::index_unavailable("index", reason);

        let bytes = std::fs::read(path).map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        let tensors = SafeTensors::deserialize(&bytes).map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        let view = tensors
            .tensor(TENSOR_NAME)
            .map_err(|e| unavailable(format!("missing '{}' tensor: {}", TENSOR_NAME, e)))?;

        if view.dtype() != Dtype::F32 {
            return Err(unavailable(format!("expected F32 tensor, found {:?}", view.dtype())));
        }

        let (rows, dim) = match view.shape() {
            [rows, dim] => (*rows, *dim),
            other => return Err(unavailable(format!("expected a 2-D tensor, found shape {:?}", other))),
        };

        let values: Vec<f32> = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let matrix = Array2::from_shape_vec((rows, dim), values)
            .map_err(|e| unavailable(format!("corrupt tensor data: {}", e)))?;

        info!("Loaded index with {} rows (dim {}) from {}", rows, dim, path.display());
        Ok(Self { matrix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> VectorIndex {
        VectorIndex::from_vectors(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_descending_score() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 2);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_k_larger_than_index_returns_everything() {
        let index = sample_index();
        let hits = index.search(&[0.0, 0.0, 1.0], 50).unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].position, 3);
    }

    #[test]
    fn test_ties_keep_row_order() {
        let index = VectorIndex::from_vectors(vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_rejects_ragged_rows_and_wrong_query_width() {
        assert!(VectorIndex::from_vectors(vec![vec![1.0, 0.0], vec![1.0]]).is_err());
        assert!(sample_index().search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_empty_index_searches_to_nothing() {
        let index = VectorIndex::from_vectors(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job_index.safetensors");
        let index = sample_index();

        index.save(&path, "test-model").unwrap();
        let loaded = VectorIndex::load(&path).unwrap();

        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(
            loaded.search(&[0.0, 1.0, 0.0], 2).unwrap(),
            index.search(&[0.0, 1.0, 0.0], 2).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file_is_index_unavailable() {
        let err = VectorIndex::load(Path::new("/nonexistent/job_index.safetensors")).unwrap_err();
        assert!(matches!(err, InterviewError::IndexUnavailable { ref asset, .. } if asset == "index"));
    }
}
