//! Model management: downloading and caching Hugging Face models

use crate::config::{AvailableModel, Config, ModelType};
use crate::error::{InterviewError, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use log::{debug, info};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Files fetched when present, on top of the weights.
const METADATA_FILES: [&str; 4] = [
    "config.json",
    "tokenizer.json",
    "tokenizer_config.json",
    "generation_config.json",
];

/// Downloads catalog models into `models_dir/<name>` and tracks what is on disk.
pub struct ModelManager {
    models_dir: PathBuf,
    catalog: Vec<AvailableModel>,
    downloaded_models: HashSet<String>,
    api: Api,
}

impl ModelManager {
    pub async fn new(config: &Config) -> Result<Self> {
        let models_dir = config.models_dir().clone();
        fs::create_dir_all(&models_dir).await.map_err(|e| {
            InterviewError::ModelError(format!("Failed to create models directory: {}", e))
        })?;

        let api = Api::new()
            .map_err(|e| InterviewError::ModelError(format!("Failed to initialize HF API: {}", e)))?;

        let mut manager = Self {
            models_dir,
            catalog: config.models.available_models.clone(),
            downloaded_models: HashSet::new(),
            api,
        };
        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_valid_model_directory(&entry.path()).await? {
                debug!("Found downloaded model {}", name);
                self.downloaded_models.insert(name);
            }
        }

        Ok(())
    }

    pub fn get_model_info(&self, model_id: &str) -> Option<&AvailableModel> {
        self.catalog.iter().find(|m| m.name == model_id)
    }

    fn require_model_info(&self, model_id: &str) -> Result<&AvailableModel> {
        self.get_model_info(model_id).ok_or_else(|| {
            InterviewError::ModelNotFound(format!(
                "Unknown model: {}. Run 'models list' to see the catalog",
                model_id
            ))
        })
    }

    /// Download a catalog model. Returns its directory; no-op when already present.
    pub async fn download_model(&mut self, model_id: &str) -> Result<PathBuf> {
        let model_info = self.require_model_info(model_id)?.clone();
        let model_dir = self.models_dir.join(model_id);

        if self.downloaded_models.contains(model_id) {
            return Ok(model_dir);
        }

        println!("Downloading {} ({} MB) from {}", model_info.name, model_info.size_mb, model_info.repo_id);
        fs::create_dir_all(&model_dir).await?;

        let repo = self.api.model(model_info.repo_id.clone());

        for file in METADATA_FILES {
            if let Ok(cached) = repo.get(file).await {
                copy_into(&cached, &model_dir, file).await?;
            }
        }

        match model_info.model_type {
            ModelType::Embedding => {
                let cached = repo.get("model.safetensors").await.map_err(|e| {
                    InterviewError::ModelError(format!("Failed to download embedding weights: {}", e))
                })?;
                copy_into(&cached, &model_dir, "model.safetensors").await?;
            }
            ModelType::Oracle => download_oracle_weights(&repo, &model_dir).await?,
        }

        if !is_valid_model_directory(&model_dir).await? {
            return Err(InterviewError::ModelError(format!(
                "Download of {} is incomplete: config.json, tokenizer.json or weights missing",
                model_id
            )));
        }

        self.downloaded_models.insert(model_id.to_string());
        info!("Model {} stored in {}", model_id, model_dir.display());
        Ok(model_dir)
    }

    /// Local path to the model, downloading it first if needed.
    pub async fn ensure_model_available(&mut self, model_id: &str) -> Result<PathBuf> {
        match self.get_model_path(model_id) {
            Some(path) => Ok(path),
            None => self.download_model(model_id).await,
        }
    }

    pub fn get_model_path(&self, model_id: &str) -> Option<PathBuf> {
        self.downloaded_models
            .contains(model_id)
            .then(|| self.models_dir.join(model_id))
    }

    pub fn is_model_downloaded(&self, model_id: &str) -> bool {
        self.downloaded_models.contains(model_id)
    }

    /// Catalog entries of one kind, in configuration order.
    pub fn list_available_models(&self, model_type: ModelType) -> Vec<&AvailableModel> {
        self.catalog.iter().filter(|m| m.model_type == model_type).collect()
    }

    pub fn list_downloaded_models(&self) -> Vec<String> {
        let sorted: BTreeSet<&String> = self.downloaded_models.iter().collect();
        sorted.into_iter().cloned().collect()
    }

    pub async fn remove_model(&mut self, model_id: &str) -> Result<()> {
        let model_dir = self.models_dir.join(model_id);
        if !self.downloaded_models.remove(model_id) && !model_dir.exists() {
            return Err(InterviewError::ModelNotFound(format!(
                "Model {} is not downloaded",
                model_id
            )));
        }

        if model_dir.exists() {
            fs::remove_dir_all(&model_dir).await?;
        }
        info!("Removed model {}", model_id);
        Ok(())
    }
}

async fn copy_into(cached: &Path, model_dir: &Path, file: &str) -> Result<()> {
    fs::copy(cached, model_dir.join(file))
        .await
        .map_err(|e| InterviewError::ModelError(format!("Failed to copy {}: {}", file, e)))?;
    println!("  downloaded {}", file);
    Ok(())
}

/// Sharded safetensors first, then a single weights file.
async fn download_oracle_weights(repo: &ApiRepo, model_dir: &Path) -> Result<()> {
    if let Ok(index_path) = repo.get("model.safetensors.index.json").await {
        copy_into(&index_path, model_dir, "model.safetensors.index.json").await?;

        let index: serde_json::Value = serde_json::from_str(&fs::read_to_string(&index_path).await?)?;
        let shards: BTreeSet<String> = index
            .get("weight_map")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.values()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if shards.is_empty() {
            return Err(InterviewError::ModelError(
                "Safetensors index lists no weight shards".to_string(),
            ));
        }

        for shard in shards {
            let cached = repo.get(&shard).await.map_err(|e| {
                InterviewError::ModelError(format!("Failed to download shard {}: {}", shard, e))
            })?;
            copy_into(&cached, model_dir, &shard).await?;
        }
        return Ok(());
    }

    let cached = repo
        .get("model.safetensors")
        .await
        .map_err(|e| InterviewError::ModelError(format!("Failed to download model weights: {}", e)))?;
    copy_into(&cached, model_dir, "model.safetensors").await
}

/// A model directory needs a config, a tokenizer and at least one safetensors file.
async fn is_valid_model_directory(path: &Path) -> Result<bool> {
    for required in ["config.json", "tokenizer.json"] {
        if fs::metadata(path.join(required)).await.is_err() {
            return Ok(false);
        }
    }

    let mut entries = fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().ends_with(".safetensors") {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.models.models_dir = dir.path().join("models");
        config
    }

    fn fake_model(root: &Path, name: &str, with_weights: bool) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();
        std::fs::write(dir.join("tokenizer.json"), "{}").unwrap();
        if with_weights {
            std::fs::write(dir.join("model.safetensors"), b"").unwrap();
        }
    }

    #[tokio::test]
    async fn test_manager_creates_models_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let manager = ModelManager::new(&config).await.unwrap();
        assert!(manager.models_dir().exists());
        assert!(manager.list_downloaded_models().is_empty());
        let embeddings = manager.list_available_models(ModelType::Embedding);
        let oracles = manager.list_available_models(ModelType::Oracle);
        assert_eq!(embeddings.len() + oracles.len(), config.models.available_models.len());
        assert!(embeddings.iter().all(|m| m.model_type == ModelType::Embedding));
        assert!(oracles.iter().any(|m| m.name == "phi-3-mini"));
        assert!(manager.get_model_info("phi-3-mini").is_some());
    }

    #[tokio::test]
    async fn test_scan_finds_complete_models_only() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        fake_model(&config.models.models_dir, "tinyllama", true);
        fake_model(&config.models.models_dir, "potion-base-8M", true);
        fake_model(&config.models.models_dir, "half-done", false);

        let manager = ModelManager::new(&config).await.unwrap();
        assert_eq!(manager.list_downloaded_models(), vec!["potion-base-8M", "tinyllama"]);
        assert!(!manager.is_model_downloaded("half-done"));
        assert_eq!(
            manager.get_model_path("tinyllama"),
            Some(config.models.models_dir.join("tinyllama"))
        );
    }

    #[tokio::test]
    async fn test_ensure_available_uses_local_copy() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        fake_model(&config.models.models_dir, "phi-3-mini", true);

        let mut manager = ModelManager::new(&config).await.unwrap();
        let path = manager.ensure_model_available("phi-3-mini").await.unwrap();
        assert_eq!(path, config.models.models_dir.join("phi-3-mini"));
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ModelManager::new(&config_in(&temp_dir)).await.unwrap();

        let err = manager.download_model("gpt-17").await.unwrap_err();
        assert!(matches!(err, InterviewError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_model() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        fake_model(&config.models.models_dir, "tinyllama", true);

        let mut manager = ModelManager::new(&config).await.unwrap();
        manager.remove_model("tinyllama").await.unwrap();
        assert!(!manager.is_model_downloaded("tinyllama"));
        assert!(!config.models.models_dir.join("tinyllama").exists());
        assert!(manager.remove_model("tinyllama").await.is_err());
    }
}
