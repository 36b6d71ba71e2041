//! Sentence embeddings using Model2Vec

use crate::error::{InterviewError, Result};
use anyhow::Context;
use log::info;
use model2vec_rs::model::StaticModel;
use std::path::Path;
use std::time::Instant;

/// Anything that turns text into a fixed-width vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn name(&self) -> &str;
}

/// Model2Vec static embedding model loaded from a local directory.
pub struct Model2VecEmbedder {
    model: StaticModel,
    model_name: String,
    batch_size: usize,
}

impl Model2VecEmbedder {
    pub fn load(model_path: &Path) -> Result<Self> {
        let start_time = Instant::now();

        if !model_path.exists() {
            return Err(InterviewError::ModelNotFound(format!(
                "Embedding model directory does not exist: {}",
                model_path.display()
            )));
        }

        let model = StaticModel::from_pretrained(
            model_path,
            None,       // token
            Some(true), // normalize
            None,       // subfolder
        )
        .with_context(|| format!("Failed to load Model2Vec model from {}", model_path.display()))?;

        info!(
            "Loaded embedding model from {} in {:.2?}",
            model_path.display(),
            start_time.elapsed()
        );

        let model_name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "model2vec".to_string());

        Ok(Self {
            model,
            model_name,
            batch_size: 256,
        })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        self.model.encode_single(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.model.encode_with_args(texts, Some(512), self.batch_size)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_directory() {
        let err = Model2VecEmbedder::load(Path::new("/nonexistent/model2vec")).err().unwrap();
        assert!(matches!(err, InterviewError::ModelNotFound(_)));
    }
}
