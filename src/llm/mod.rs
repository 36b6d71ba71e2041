//! Decision oracles: the language models that pick the next question

pub mod model_manager;
pub mod inference;
pub mod ollama;
pub mod prompts;

use crate::config::{Config, OracleKind};
use crate::error::Result;
use inference::{InferenceConfig, LocalOracle};
use model_manager::ModelManager;
use ollama::OllamaOracle;
use std::future::Future;
use std::time::Duration;

/// A model that answers a system + user instruction pair with raw text.
///
/// Replies are not trusted to be well formed; callers parse them defensively.
pub trait DecisionOracle {
    fn respond(&mut self, system: &str, user: &str) -> impl Future<Output = Result<String>> + Send;

    fn describe(&self) -> String;
}

/// Oracle chosen at runtime from configuration.
pub enum OracleBackend {
    Ollama(OllamaOracle),
    Local(LocalOracle),
}

impl OracleBackend {
    /// Build the configured oracle. `model` overrides the configured model name.
    pub async fn from_config(config: &Config, kind: OracleKind, model: Option<String>) -> Result<Self> {
        match kind {
            OracleKind::Ollama => {
                let model = model.unwrap_or_else(|| config.oracle.model.clone());
                Ok(OracleBackend::Ollama(OllamaOracle::new(&config.oracle, model)?))
            }
            OracleKind::Local => {
                let model_id = model.unwrap_or_else(|| config.models.default_oracle_model.clone());
                let mut manager = ModelManager::new(config).await?;
                let model_path = manager.ensure_model_available(&model_id).await?;

                let inference_config = InferenceConfig {
                    max_tokens: config.oracle.max_tokens,
                    temperature: config.oracle.temperature,
                    top_p: Some(0.9),
                    seed: config.oracle.seed,
                    repeat_penalty: 1.1,
                    time_budget: Some(Duration::from_secs(config.oracle.timeout_secs)),
                };
                let oracle = LocalOracle::load(&model_path, &model_id, inference_config)?;
                Ok(OracleBackend::Local(oracle))
            }
        }
    }
}

impl DecisionOracle for OracleBackend {
    async fn respond(&mut self, system: &str, user: &str) -> Result<String> {
        match self {
            OracleBackend::Ollama(oracle) => oracle.respond(system, user).await,
            OracleBackend::Local(oracle) => oracle.respond(system, user).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            OracleBackend::Ollama(oracle) => oracle.describe(),
            OracleBackend::Local(oracle) => oracle.describe(),
        }
    }
}
