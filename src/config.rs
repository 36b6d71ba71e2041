//! Configuration management for the interview agent

use crate::error::{InterviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub assets: AssetConfig,
    pub oracle: OracleConfig,
    pub interview: InterviewConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub default_embedding_model: String,
    pub default_oracle_model: String,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub model_type: ModelType,
    pub size_mb: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    Embedding,
    Oracle,
}

/// Location of the job index assets. All three must agree on row order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub assets_dir: PathBuf,
    pub index_file: String,
    pub records_file: String,
    /// Overrides `models_dir/<default_embedding_model>` when set.
    pub embedding_model_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub backend: OracleKind,
    pub ollama_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    Ollama,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    pub top_k: usize,
    pub default_query: Option<String>,
    pub max_questions: usize,
    pub max_parse_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
}

impl std::str::FromStr for OracleKind {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(OracleKind::Ollama),
            "local" => Ok(OracleKind::Local),
            other => Err(InterviewError::InvalidInput(format!(
                "Unknown oracle backend: {}. Supported: ollama, local",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nco-interview");

        Self {
            models: ModelConfig {
                models_dir: base_dir.join("models"),
                default_embedding_model: "potion-base-8M".to_string(),
                default_oracle_model: "phi-3-mini".to_string(),
                available_models: vec![
                    AvailableModel {
                        name: "potion-base-8M".to_string(),
                        repo_id: "minishlab/potion-base-8M".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 33,
                        description: "Compact Model2Vec sentence embeddings".to_string(),
                    },
                    AvailableModel {
                        name: "m2v-base".to_string(),
                        repo_id: "minishlab/M2V_base_output".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 90,
                        description: "Model2Vec base embeddings model".to_string(),
                    },
                    AvailableModel {
                        name: "phi-3-mini".to_string(),
                        repo_id: "microsoft/Phi-3-mini-4k-instruct".to_string(),
                        model_type: ModelType::Oracle,
                        size_mb: 2300,
                        description: "Small instruction model for local interviews".to_string(),
                    },
                    AvailableModel {
                        name: "llama-3.1-8b".to_string(),
                        repo_id: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
                        model_type: ModelType::Oracle,
                        size_mb: 8000,
                        description: "Stronger local interviewer, needs a GPU to be pleasant".to_string(),
                    },
                    AvailableModel {
                        name: "tinyllama".to_string(),
                        repo_id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
                        model_type: ModelType::Oracle,
                        size_mb: 1100,
                        description: "Ultra-lightweight model, JSON output is unreliable".to_string(),
                    },
                ],
            },
            assets: AssetConfig {
                assets_dir: base_dir.join("assets"),
                index_file: "job_index.safetensors".to_string(),
                records_file: "job_records.json".to_string(),
                embedding_model_dir: None,
            },
            oracle: OracleConfig {
                backend: OracleKind::Ollama,
                ollama_url: "http://localhost:11434".to_string(),
                model: "llama3.1:8b".to_string(),
                timeout_secs: 120,
                temperature: 0.2,
                max_tokens: 256,
                seed: 42,
            },
            interview: InterviewConfig {
                top_k: 3,
                default_query: None,
                max_questions: 12,
                max_parse_retries: 2,
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Read the config at `path`, writing the defaults there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| InterviewError::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| InterviewError::Configuration(format!("Failed to serialize config: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("nco-interview")
            .join("config.toml")
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.assets.assets_dir.join(&self.assets.index_file)
    }

    pub fn records_path(&self) -> PathBuf {
        self.assets.assets_dir.join(&self.assets.records_file)
    }

    pub fn embedding_model_path(&self) -> PathBuf {
        self.assets
            .embedding_model_dir
            .clone()
            .unwrap_or_else(|| self.models.models_dir.join(&self.models.default_embedding_model))
    }

    /// Update a single value addressed by a dotted key, e.g. `interview.top_k`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut tree = toml::Value::try_from(&*self)
            .map_err(|e| InterviewError::Configuration(format!("Failed to serialize config: {}", e)))?;

        let mut node = &mut tree;
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| InterviewError::Configuration("Empty configuration key".to_string()))?;

        for part in parents {
            node = node
                .get_mut(*part)
                .ok_or_else(|| InterviewError::Configuration(format!("Unknown configuration key: {}", key)))?;
        }

        let table = node
            .as_table_mut()
            .ok_or_else(|| InterviewError::Configuration(format!("Not a configuration section: {}", key)))?;

        let new_value = match table.get(*last) {
            Some(toml::Value::Integer(_)) => value
                .parse::<i64>()
                .map(toml::Value::Integer)
                .map_err(|_| InterviewError::Configuration(format!("{} expects an integer", key)))?,
            Some(toml::Value::Float(_)) => value
                .parse::<f64>()
                .map(toml::Value::Float)
                .map_err(|_| InterviewError::Configuration(format!("{} expects a number", key)))?,
            Some(toml::Value::Boolean(_)) => value
                .parse::<bool>()
                .map(toml::Value::Boolean)
                .map_err(|_| InterviewError::Configuration(format!("{} expects true or false", key)))?,
            Some(toml::Value::String(_)) => toml::Value::String(value.to_string()),
            // Optional values are omitted from the tree while unset.
            None if parents.len() == 1 => toml::Value::String(value.to_string()),
            _ => {
                return Err(InterviewError::Configuration(format!(
                    "Unsupported configuration key: {}",
                    key
                )))
            }
        };

        table.insert(last.to_string(), new_value);

        *self = tree
            .try_into()
            .map_err(|e| InterviewError::Configuration(format!("Invalid value for {}: {}", key, e)))?;
        Ok(())
    }
}
