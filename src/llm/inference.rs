//! Local oracle: Llama / Phi-3 inference with Candle

use crate::error::{InterviewError, Result};
use crate::llm::DecisionOracle;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::{llama, phi3};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokenizers::Tokenizer;

/// Tokens considered when penalising repeats.
const REPEAT_WINDOW: usize = 64;

/// Configuration for local generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub seed: u64,
    pub repeat_penalty: f32,
    /// Wall-clock limit for one generation; checked between tokens.
    pub time_budget: Option<Duration>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.2,
            top_p: Some(0.9),
            seed: 42,
            repeat_penalty: 1.1,
            time_budget: None,
        }
    }
}

/// Prompt layout expected by the model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFormat {
    Phi3,
    Llama3,
    Zephyr,
}

impl ChatFormat {
    pub fn render(&self, system: &str, user: &str) -> String {
        match self {
            ChatFormat::Phi3 => format!(
                "<|system|>\n{}<|end|>\n<|user|>\n{}<|end|>\n<|assistant|>\n",
                system.trim(),
                user.trim()
            ),
            ChatFormat::Llama3 => format!(
                "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>\
                 <|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|>\
                 <|start_header_id|>assistant<|end_header_id|>\n\n",
                system.trim(),
                user.trim()
            ),
            ChatFormat::Zephyr => format!(
                "<|system|>\n{}</s>\n<|user|>\n{}</s>\n<|assistant|>\n",
                system.trim(),
                user.trim()
            ),
        }
    }

    /// Whether the tokenizer should prepend its own BOS token.
    fn adds_special_tokens(&self) -> bool {
        !matches!(self, ChatFormat::Llama3)
    }
}

enum ModelWeights {
    Phi3(phi3::Model),
    Llama {
        model: llama::Llama,
        cache: llama::Cache,
        config: llama::Config,
    },
}

impl ModelWeights {
    fn forward(&mut self, input: &Tensor, offset: usize) -> Result<Tensor> {
        let logits = match self {
            ModelWeights::Phi3(model) => model.forward(input, offset)?,
            ModelWeights::Llama { model, cache, .. } => model.forward(input, offset, cache)?,
        };
        Ok(logits.flatten_all()?.to_dtype(DType::F32)?)
    }

    fn reset(&mut self, device: &Device) -> Result<()> {
        match self {
            ModelWeights::Phi3(model) => model.clear_kv_cache(),
            ModelWeights::Llama { cache, config, .. } => {
                *cache = llama::Cache::new(true, DType::F32, config, device)?;
            }
        }
        Ok(())
    }
}

/// Weights, tokenizer and sampling settings for one loaded model.
struct LocalEngine {
    model: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    config: InferenceConfig,
    format: ChatFormat,
    eos_tokens: HashSet<u32>,
    model_id: String,
}

/// A language model running in-process.
///
/// Generation is CPU/GPU bound, so each reply runs on the blocking thread pool
/// and the engine is shared with that thread through a mutex.
pub struct LocalOracle {
    engine: Arc<Mutex<LocalEngine>>,
    model_id: String,
    device: String,
    time_budget: Option<Duration>,
}

/// Pick the best available device. `NCO_INTERVIEW_DEVICE=cpu|cuda|metal` overrides.
pub fn select_device() -> Result<Device> {
    if let Ok(preference) = std::env::var("NCO_INTERVIEW_DEVICE") {
        match preference.to_lowercase().as_str() {
            "cpu" => return Ok(Device::Cpu),
            "cuda" => return Ok(Device::new_cuda(0)?),
            "metal" => return Ok(Device::new_metal(0)?),
            other => warn!("Unknown device '{}', falling back to auto-detection", other),
        }
    }

    if candle_core::utils::cuda_is_available() {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA GPU for inference");
            return Ok(device);
        }
    }

    if candle_core::utils::metal_is_available() {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal GPU for inference");
            return Ok(device);
        }
    }

    info!("No GPU available, using CPU");
    Ok(Device::Cpu)
}

/// Weight files for a model directory: sharded via the index file, or a single file.
fn weight_files(model_path: &Path) -> Result<Vec<PathBuf>> {
    let index_path = model_path.join("model.safetensors.index.json");
    if index_path.exists() {
        let index: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;
        let weight_map = index
            .get("weight_map")
            .and_then(|v| v.as_object())
            .ok_or_else(|| InterviewError::ModelError("Invalid safetensors index: missing weight_map".to_string()))?;

        let mut files: Vec<String> = weight_map
            .values()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        files.sort();
        files.dedup();

        return Ok(files.into_iter().map(|f| model_path.join(f)).collect());
    }

    let single = model_path.join("model.safetensors");
    if single.exists() {
        Ok(vec![single])
    } else {
        Err(InterviewError::ModelError(
            "Model weights file not found (neither sharded nor single safetensors)".to_string(),
        ))
    }
}

impl LocalOracle {
    /// Load a model directory containing `config.json`, `tokenizer.json` and safetensors weights.
    pub fn load(model_path: &Path, model_id: &str, config: InferenceConfig) -> Result<Self> {
        let start = Instant::now();

        if !model_path.exists() {
            return Err(InterviewError::ModelNotFound(format!(
                "Model directory does not exist: {}",
                model_path.display()
            )));
        }

        let device = select_device()?;

        let tokenizer = Tokenizer::from_file(model_path.join("tokenizer.json"))
            .map_err(|e| InterviewError::ModelError(format!("Failed to load tokenizer: {}", e)))?;

        let model_config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(model_path.join("config.json"))?)?;

        let architecture = model_config["architectures"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let model_type = model_config["model_type"].as_str().unwrap_or("").to_string();
        let vocab_size = model_config["vocab_size"].as_u64().unwrap_or(32000);

        let files = weight_files(model_path)?;
        debug!("Loading {} weight file(s) for {}", files.len(), model_id);
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files, DType::F32, &device)? };

        let (model, format) = if model_type.starts_with("phi") || architecture.starts_with("Phi") {
            let phi_config: phi3::Config = serde_json::from_value(model_config)
                .map_err(|e| InterviewError::ModelError(format!("Failed to parse Phi-3 config: {}", e)))?;
            (ModelWeights::Phi3(phi3::Model::new(&phi_config, vb)?), ChatFormat::Phi3)
        } else if model_type == "llama" || architecture == "LlamaForCausalLM" {
            let llama_config: llama::LlamaConfig = serde_json::from_value(model_config)
                .map_err(|e| InterviewError::ModelError(format!("Failed to parse Llama config: {}", e)))?;
            let config = llama_config.into_config(false);
            let model = llama::Llama::load(vb, &config)?;
            let cache = llama::Cache::new(true, DType::F32, &config, &device)?;
            let format = if vocab_size >= 128_000 {
                ChatFormat::Llama3
            } else {
                ChatFormat::Zephyr
            };
            (ModelWeights::Llama { model, cache, config }, format)
        } else {
            return Err(InterviewError::ModelError(format!(
                "Unsupported model architecture '{}' (model_type '{}')",
                architecture, model_type
            )));
        };

        let eos_tokens = ["</s>", "<|endoftext|>", "<|end|>", "<|eot_id|>", "<|end_of_text|>"]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();

        info!("Loaded local oracle {} in {:.2?}", model_id, start.elapsed());

        let time_budget = config.time_budget;
        let device_label = format!("{:?}", device);
        let engine = LocalEngine {
            model,
            tokenizer,
            device,
            config,
            format,
            eos_tokens,
            model_id: model_id.to_string(),
        };

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            model_id: model_id.to_string(),
            device: device_label,
            time_budget,
        })
    }
}

impl LocalEngine {
    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| InterviewError::ModelError(format!("Failed to decode tokens: {}", e)))
    }

    /// Generate a completion. Stops at an end-of-sequence token, at the token
    /// budget, or as soon as the first JSON object in the output is closed.
    /// Fails once `deadline` has passed.
    fn generate(&mut self, system: &str, user: &str, deadline: Option<Instant>) -> Result<String> {
        let start = Instant::now();
        self.model.reset(&self.device)?;

        let prompt = self.format.render(system, user);
        let encoding = self
            .tokenizer
            .encode(prompt.as_str(), self.format.adds_special_tokens())
            .map_err(|e| InterviewError::ModelError(format!("Failed to tokenize input: {}", e)))?;

        let mut tokens = encoding.get_ids().to_vec();
        let prompt_len = tokens.len();

        let temperature = (self.config.temperature > 0.0).then_some(self.config.temperature);
        let mut sampler = LogitsProcessor::new(self.config.seed, temperature, self.config.top_p);

        for step in 0..self.config.max_tokens {
            if past_deadline(deadline, Instant::now()) {
                return Err(InterviewError::Oracle(format!(
                    "{} ran out of time after {} tokens",
                    self.model_id,
                    tokens.len() - prompt_len
                )));
            }

            let (context, offset) = if step == 0 {
                (&tokens[..], 0)
            } else {
                (&tokens[tokens.len() - 1..], tokens.len() - 1)
            };

            let input = Tensor::new(context, &self.device)?.unsqueeze(0)?;
            let mut logits = self.model.forward(&input, offset)?;

            if self.config.repeat_penalty != 1.0 {
                let window_start = tokens.len().saturating_sub(REPEAT_WINDOW);
                logits = candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.config.repeat_penalty,
                    &tokens[window_start..],
                )?;
            }

            let next = sampler.sample(&logits)?;
            if self.eos_tokens.contains(&next) {
                break;
            }
            tokens.push(next);

            let text = self.decode(&tokens[prompt_len..])?;
            if json_object_closed(&text) {
                break;
            }
        }

        let generated = &tokens[prompt_len..];
        debug!(
            "{} generated {} tokens in {:.2?}",
            self.model_id,
            generated.len(),
            start.elapsed()
        );
        self.decode(generated)
    }
}

fn past_deadline(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}

/// Run blocking work on the blocking thread pool so the calling task stays
/// responsive to timers and cancellation.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| InterviewError::Oracle(format!("oracle task failed: {}", e)))?
}

/// True once the text contains a `{` whose matching `}` has been written.
fn json_object_closed(text: &str) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut opened = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if opened => in_string = true,
            '{' => {
                depth += 1;
                opened = true;
            }
            '}' if opened => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

impl DecisionOracle for LocalOracle {
    async fn respond(&mut self, system: &str, user: &str) -> Result<String> {
        let engine = Arc::clone(&self.engine);
        let (system, user) = (system.to_string(), user.to_string());
        let deadline = self.time_budget.map(|budget| Instant::now() + budget);

        run_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| InterviewError::Oracle("local model state is poisoned".to_string()))?;
            engine.generate(&system, &user, deadline).map_err(|e| match e {
                InterviewError::Oracle(_) => e,
                other => InterviewError::Oracle(format!("local inference failed: {}", other)),
            })
        })
        .await
    }

    fn describe(&self) -> String {
        format!("local:{} on {}", self.model_id, self.device)
    }
}
