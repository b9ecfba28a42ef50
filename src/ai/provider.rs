//! OpenAI-Compatible Provider Endpoint
//!
//! A single logical provider: one OpenAI-compatible chat-completions base
//! URL with Bearer auth and an ordered model table per model type. Retry,
//! fallback, and budget discipline live in the client; an endpoint performs
//! single-shot execution only.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ProviderSettings;
use crate::types::{ClauseError, ErrorClassifier, LlmError, Result};

// =============================================================================
// Messages and Model Types
// =============================================================================

/// One chat message in an OpenAI-compatible request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model selection class; each maps to an ordered model list per provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Fast,
    Smart,
    Structured,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Smart => write!(f, "smart"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

// =============================================================================
// Provider Endpoint
// =============================================================================

/// One provider endpoint with secure API key handling
pub struct ProviderEndpoint {
    name: String,
    base_url: Url,
    /// Never exposed in logs or debug output
    api_key: SecretString,
    models: crate::config::ModelTable,
    client: reqwest::Client,
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ProviderEndpoint {
    /// Build an endpoint from settings; the API key comes from the settings
    /// or the configured environment variable
    pub fn from_settings(settings: &ProviderSettings, timeout_secs: u64) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var(&settings.api_key_env).ok())
            .ok_or_else(|| {
                ClauseError::Config(format!(
                    "API key for provider '{}' not found. Set {} or provide llm.{}.api_key",
                    settings.name, settings.api_key_env, settings.name
                ))
            })?;

        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ClauseError::Config(format!(
                "Invalid base URL for provider '{}': {e}",
                settings.name
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClauseError::LlmApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: settings.name.clone(),
            base_url,
            api_key: SecretString::from(api_key),
            models: settings.models.clone(),
            client,
        })
    }

    /// Provider name for logging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered model list for a model type; unknown types use the fast list
    pub fn models_for(&self, model_type: ModelType) -> &[String] {
        let list = match model_type {
            ModelType::Fast => &self.models.fast,
            ModelType::Smart => &self.models.smart,
            ModelType::Structured => &self.models.structured,
        };
        if list.is_empty() { &self.models.fast } else { list }
    }

    /// Execute one chat-completions request against one model
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.as_str().trim_end_matches('/'));

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
            max_tokens,
        };

        debug!(provider = %self.name, model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify(&e.to_string(), &self.name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("{status}: {body}"),
                &self.name,
            ));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify(&format!("response parse: {e}"), &self.name))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ErrorClassifier::classify("empty response from model", &self.name)
            })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelTable, ProviderSettings};
    use crate::types::ErrorCategory;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            name: "test".to_string(),
            base_url: "https://llm.example/v1".to_string(),
            api_key: Some("sk-test".to_string()),
            api_key_env: "CLAUSEGUARD_UNSET_KEY".to_string(),
            models: ModelTable::default(),
        }
    }

    #[test]
    fn test_endpoint_from_settings() {
        let endpoint = ProviderEndpoint::from_settings(&settings(), 30).expect("endpoint");
        assert_eq!(endpoint.name(), "test");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let mut s = settings();
        s.api_key = None;
        let err = ProviderEndpoint::from_settings(&s, 30).unwrap_err();
        assert!(matches!(err, ClauseError::Config(_)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut s = settings();
        s.base_url = "not a url".to_string();
        assert!(ProviderEndpoint::from_settings(&s, 30).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let endpoint = ProviderEndpoint::from_settings(&settings(), 30).expect("endpoint");
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_models_for_falls_back_to_fast() {
        let mut s = settings();
        s.models.structured = Vec::new();
        let endpoint = ProviderEndpoint::from_settings(&s, 30).expect("endpoint");
        assert_eq!(
            endpoint.models_for(ModelType::Structured),
            endpoint.models_for(ModelType::Fast)
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_classified() {
        let mut s = settings();
        // Reserved TEST-NET address; the connection fails fast
        s.base_url = "http://192.0.2.1:9".to_string();
        let endpoint = ProviderEndpoint::from_settings(&s, 1).expect("endpoint");
        let err = endpoint
            .chat(&[ChatMessage::user("hi")], "model-x", 0.3, 16)
            .await
            .unwrap_err();
        assert!(matches!(
            err.category,
            ErrorCategory::Network | ErrorCategory::Unknown | ErrorCategory::Transient
        ));
    }
}
