//! Oracle backed by a local Ollama server.

use crate::config::OracleConfig;
use crate::error::{InterviewError, Result};
use crate::llm::DecisionOracle;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'a str,
    options: &'a ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: usize,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model,
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
                seed: config.seed,
            },
        })
    }

    fn build_request<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            format: "json",
            options: &self.options,
        }
    }

    /// Check if the Ollama server is reachable.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("Ollama health check failed with status {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Ollama unreachable at {}: {}", self.base_url, e);
                false
            }
        }
    }
}

impl DecisionOracle for OllamaOracle {
    async fn respond(&mut self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.build_request(system, user);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InterviewError::Oracle(format!("Ollama HTTP error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InterviewError::Oracle(format!("Ollama returned {}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InterviewError::Oracle(format!("Ollama JSON parse error: {}", e)))?;

        debug!("Ollama ({}) replied with {} chars", self.model, chat.message.content.len());
        Ok(chat.message.content)
    }

    fn describe(&self) -> String {
        format!("ollama:{} @ {}", self.model, self.base_url)
    }
}
