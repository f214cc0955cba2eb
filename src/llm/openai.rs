//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::llm::{LlmConfig, LlmProvider, LlmProviderInfo, LlmProviderType};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAILlmProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAILlmProvider {
    pub fn new(config: LlmConfig) -> Result<Self, EngineError> {
        if config.provider_type == LlmProviderType::OpenAI && config.api_key.is_none() {
            return Err(EngineError::Llm(
                "API key required for OpenAI provider".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EngineError::Llm(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OpenAILlmProvider {
    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::Llm(format!(
                "provider returned {}: {}",
                status,
                detail.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::Llm("response missing choices".to_string()))
    }

    fn info(&self) -> LlmProviderInfo {
        LlmProviderInfo {
            name: match self.config.provider_type {
                LlmProviderType::Local => "local".to_string(),
                _ => "openai".to_string(),
            },
            model: self.config.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> LlmConfig {
        LlmConfig {
            provider_type: LlmProviderType::Local,
            model: "qwen2.5-coder".to_string(),
            base_url: Some("http://localhost:11434/v1/".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn openai_requires_api_key() {
        let config = LlmConfig {
            provider_type: LlmProviderType::OpenAI,
            ..LlmConfig::default()
        };
        assert!(OpenAILlmProvider::new(config).is_err());
    }

    #[test]
    fn local_endpoint_needs_no_key_and_normalizes_url() {
        let provider = OpenAILlmProvider::new(local_config()).unwrap();
        assert_eq!(
            provider.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(provider.info().name, "local");
    }
}
