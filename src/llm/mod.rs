//! LLM provider abstraction.
//!
//! Synthesis (and any classification step that wants model help) talks to a
//! provider through [`LlmProvider`]. The stub provider keeps tests
//! deterministic; the OpenAI provider also covers local OpenAI-compatible
//! endpoints via `base_url`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

pub mod openai;
pub mod stub;

pub use openai::OpenAILlmProvider;
pub use stub::StubLlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    Stub,
    OpenAI,
    /// OpenAI-compatible endpoint reached through `base_url` (ollama, vllm).
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: LlmProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_provider_type() -> LlmProviderType {
    LlmProviderType::Stub
}
fn default_model() -> String {
    "stub-model".to_string()
}
fn default_max_tokens() -> Option<u32> {
    Some(2000)
}
fn default_temperature() -> Option<f64> {
    Some(0.2)
}
fn default_timeout_seconds() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmProviderInfo {
    pub name: String,
    pub model: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single prompt in, raw completion text out.
    async fn complete(&self, prompt: &str) -> Result<String, EngineError>;

    fn info(&self) -> LlmProviderInfo;
}

pub fn make_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, EngineError> {
    match config.provider_type {
        LlmProviderType::Stub => Ok(Arc::new(StubLlmProvider::new())),
        LlmProviderType::OpenAI | LlmProviderType::Local => {
            Ok(Arc::new(OpenAILlmProvider::new(config.clone())?))
        }
    }
}
