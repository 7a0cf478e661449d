//! Language-model provider interface and implementations
//!
//! The provider is an injected strategy: a network-backed Ollama client
//! for real use and a deterministic responder for tests, so the
//! fallback-on-failure path can be exercised without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Request timeout; there is no automatic retry on top of it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// External text-generation provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the prompt under the system instructions
    async fn generate(&self, prompt: &str, system: &str) -> Result<String>;
}

/// Ollama-backed provider (POST /api/generate, non-streaming)
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a provider with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
    }

    /// Create a provider with custom endpoint and model
    pub fn with_config(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RagError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// List models available on the Ollama host
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RagError::OllamaApiError(format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::OllamaApiError(
                "Failed to retrieve model list".to_string(),
            ));
        }

        let models_response: ModelsResponse = response
            .json()
            .await
            .map_err(|e| RagError::OllamaApiError(format!("Failed to parse models: {}", e)))?;

        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: system.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::OllamaApiError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::OllamaApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::OllamaApiError(format!("Failed to parse response: {}", e)))?;

        Ok(body.response)
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
}

/// Ollama generate response
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Deterministic provider for tests
///
/// Returns a fixed reply (or a fixed error) and records every prompt it
/// receives, so tests can assert both the grounding prompt content and
/// that generation was never invoked on HITL short-circuits.
pub struct FixedResponder {
    reply: Result<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FixedResponder {
    /// Responder that always succeeds with the given text
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Responder that always fails, for exercising the fallback path
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(RagError::OllamaApiError(message.into())),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of generate calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for FixedResponder {
    async fn generate(&self, prompt: &str, _system: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(RagError::OllamaApiError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OllamaProvider::new();
        assert!(provider.is_ok());

        let provider = provider.unwrap();
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert_eq!(provider.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_provider_with_config_trims_trailing_slash() {
        let provider = OllamaProvider::with_config("http://localhost:11434/", "llama3.2").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_fixed_responder_replies_and_counts() {
        let responder = FixedResponder::new("回答です");
        let reply = responder.generate("質問", "system").await.unwrap();
        assert_eq!(reply, "回答です");
        assert_eq!(responder.call_count(), 1);
        assert_eq!(responder.prompts(), vec!["質問".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_responder_errors() {
        let responder = FixedResponder::failing("down");
        assert!(responder.generate("質問", "system").await.is_err());
        assert_eq!(responder.call_count(), 1);
    }
}
