//! Resilient Model Client
//!
//! Mediates all generation calls:
//!
//! 1. Pre-flight token budget enforcement before any network I/O
//! 2. Ordered multi-model attempts on the primary provider
//! 3. Cross-provider fallback after the primary list is exhausted
//! 4. Classified failure routing: rate limits pause then continue,
//!    insufficient credits abort immediately, everything else skips to the
//!    next model
//! 5. Structured-output mode with fence stripping, typed validation, and a
//!    bounded constant-backoff retry loop
//!
//! Every call is wrapped in an observation span; the tracer is a no-op when
//! the observability backend is unconfigured.

use backon::{ConstantBuilder, Retryable};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::ai::observe::Tracer;
use crate::ai::provider::{ChatMessage, ModelType, ProviderEndpoint};
use crate::ai::schema::{self, StructuredOutput};
use crate::config::LlmConfig;
use crate::constants::llm as llm_constants;
use crate::types::{ClauseError, LlmError, Result};

/// Shared model client handle used across pipeline stages
pub type SharedModelClient = Arc<ModelClient>;

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct ClientStats {
    pub total_calls: u64,
    /// Providers do not return cost in responses; tracked for the stats
    /// surface only
    pub estimated_cost_usd: f64,
}

/// Resilient model client with primary/fallback providers
pub struct ModelClient {
    primary: ProviderEndpoint,
    fallback: Option<ProviderEndpoint>,
    affordable_tokens: u64,
    retry_delay: Duration,
    max_retries: u32,
    call_count: AtomicU64,
    tracer: Arc<Tracer>,
}

impl ModelClient {
    /// Build the client from configuration. The fallback endpoint is only
    /// constructed when configured *and* its key resolves; a fallback
    /// without credentials is skipped with a warning rather than failing
    /// the primary path.
    pub fn from_config(config: &LlmConfig, tracer: Arc<Tracer>) -> Result<Self> {
        let primary = ProviderEndpoint::from_settings(&config.primary, config.timeout_secs)?;

        let fallback = match &config.fallback {
            Some(settings) => {
                match ProviderEndpoint::from_settings(settings, config.timeout_secs) {
                    Ok(endpoint) => Some(endpoint),
                    Err(e) => {
                        warn!("Fallback provider unavailable: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            primary,
            fallback,
            affordable_tokens: config.affordable_tokens,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            max_retries: config.max_retries.max(1),
            call_count: AtomicU64::new(0),
            tracer,
        })
    }

    /// Text completion across the configured model sequence.
    ///
    /// Tries every model of the primary provider in order, then the
    /// fallback provider's list. Raises `InsufficientCredits` immediately
    /// on budget or payment failures.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model_type: ModelType,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let _span = self.tracer.span("LLM Call");

        self.preflight(messages, max_tokens)?;

        let mut last_error: Option<LlmError> = None;

        for endpoint in self.endpoints() {
            for model in endpoint.models_for(model_type) {
                debug!(provider = endpoint.name(), %model, %model_type, "trying model");

                match endpoint.chat(messages, model, temperature, max_tokens).await {
                    Ok(content) => {
                        self.call_count.fetch_add(1, Ordering::Relaxed);
                        debug!(provider = endpoint.name(), %model, "model call succeeded");
                        return Ok(content);
                    }
                    Err(err) if err.is_abort() => {
                        error!(provider = endpoint.name(), %model, "payment required: {err}");
                        return Err(ClauseError::InsufficientCredits(err.message));
                    }
                    Err(err) if err.category.should_pause() => {
                        warn!(provider = endpoint.name(), %model, "rate limited, pausing: {err}");
                        sleep(self.retry_delay).await;
                        last_error = Some(err);
                    }
                    Err(err) => {
                        warn!(provider = endpoint.name(), %model, "model failed: {err}");
                        last_error = Some(err);
                    }
                }
            }
        }

        Err(ClauseError::LlmApi(format!(
            "All models failed. Last error: {}",
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no models configured".to_string())
        )))
    }

    /// Structured completion: schema-instructed prompt, fence stripping,
    /// typed validation, bounded retry.
    ///
    /// Only parse and validation failures are retried; completion failures
    /// (including `InsufficientCredits`) propagate on first occurrence.
    pub async fn complete_structured<T: StructuredOutput>(
        &self,
        messages: &[ChatMessage],
        model_type: ModelType,
        temperature: f32,
    ) -> Result<T> {
        let _span = self.tracer.span("Structured LLM Call");

        let enhanced = schema::with_schema_instruction::<T>(messages);

        let policy = ConstantBuilder::default()
            .with_delay(Duration::from_secs(1))
            .with_max_times(self.max_retries.saturating_sub(1) as usize);

        let result = (|| async {
            let raw = self
                .complete(
                    &enhanced,
                    model_type,
                    temperature,
                    llm_constants::DEFAULT_MAX_TOKENS,
                )
                .await?;
            schema::parse_structured::<T>(&raw)
        })
        .retry(policy)
        .when(|err: &ClauseError| matches!(err, ClauseError::StructuredParse { .. }))
        .notify(|err: &ClauseError, _dur: Duration| {
            warn!("structured output attempt failed, retrying: {err}");
        })
        .await;

        match result {
            Err(ClauseError::StructuredParse { message, .. }) => {
                Err(ClauseError::StructuredParse {
                    attempts: self.max_retries,
                    message,
                })
            }
            other => other,
        }
    }

    /// Pre-flight budget check: estimated prompt tokens plus the response
    /// allowance must fit the affordable budget. Runs before any network
    /// call.
    fn preflight(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<()> {
        let prompt_chars: u64 = messages
            .iter()
            .map(|m| crate::text::char_count(&m.content) as u64)
            .sum();
        let estimated_prompt_tokens = prompt_chars / llm_constants::CHARS_PER_TOKEN;
        let total_estimated = estimated_prompt_tokens + u64::from(max_tokens);

        if total_estimated > self.affordable_tokens {
            return Err(ClauseError::InsufficientCredits(format!(
                "Request requires ~{total_estimated} tokens, which exceeds limit of {}. \
                 Reduce max_tokens or top up credits.",
                self.affordable_tokens
            )));
        }
        Ok(())
    }

    fn endpoints(&self) -> impl Iterator<Item = &ProviderEndpoint> {
        std::iter::once(&self.primary).chain(self.fallback.as_ref())
    }

    /// Usage statistics
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            total_calls: self.call_count.load(Ordering::Relaxed),
            estimated_cost_usd: 0.0,
        }
    }

    /// The observation tracer backing this client
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, ModelTable, ProviderSettings};
    use crate::types::CompoundRiskList;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Read a full HTTP request (headers plus Content-Length body)
    async fn drain_request(sock: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = sock.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() - (header_end + 4) >= content_length {
                return;
            }
        }
    }

    /// Minimal chat-completions stub: answers every request with `status`
    /// and `body`, returns the endpoint base URL.
    async fn spawn_stub(status: &'static str, body: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                drain_request(&mut sock).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/v1")
    }

    fn config_for(base_url: String) -> LlmConfig {
        LlmConfig {
            primary: ProviderSettings {
                name: "stub".to_string(),
                base_url,
                api_key: Some("sk-test".to_string()),
                api_key_env: "CLAUSEGUARD_UNSET".to_string(),
                models: ModelTable {
                    fast: vec!["stub-model".to_string()],
                    smart: vec!["stub-model".to_string()],
                    structured: vec!["stub-model".to_string()],
                },
            },
            fallback: None,
            affordable_tokens: 10_000,
            timeout_secs: 5,
            retry_delay_secs: 0,
            max_retries: 2,
        }
    }

    fn client(config: &LlmConfig) -> ModelClient {
        ModelClient::from_config(config, Arc::new(Tracer::noop())).expect("client")
    }

    fn chat_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_zero_budget_fails_without_io() {
        let mut config = config_for("http://192.0.2.1:9/v1".to_string());
        config.affordable_tokens = 0;
        let client = client(&config);

        let err = client
            .complete(&[ChatMessage::user("hi")], ModelType::Fast, 0.3, 800)
            .await
            .unwrap_err();
        assert!(matches!(err, ClauseError::InsufficientCredits(_)));
        assert_eq!(client.stats().total_calls, 0);
    }

    #[tokio::test]
    async fn test_preflight_counts_prompt_and_response() {
        let mut config = config_for("http://192.0.2.1:9/v1".to_string());
        // 900 prompt chars ≈ 300 tokens; 300 + 800 > 1000
        config.affordable_tokens = 1000;
        let client = client(&config);
        let err = client
            .complete(
                &[ChatMessage::user("x".repeat(900))],
                ModelType::Fast,
                0.3,
                800,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClauseError::InsufficientCredits(_)));
    }

    #[tokio::test]
    async fn test_successful_completion_counts_call() {
        let base = spawn_stub("200 OK", chat_body("hello there")).await;
        let client = client(&config_for(base));

        let content = client
            .complete(&[ChatMessage::user("hi")], ModelType::Fast, 0.3, 100)
            .await
            .expect("completion");
        assert_eq!(content, "hello there");
        assert_eq!(client.stats().total_calls, 1);
    }

    #[tokio::test]
    async fn test_payment_required_aborts() {
        let base = spawn_stub("402 Payment Required", "{\"error\":\"payment\"}".to_string()).await;
        let client = client(&config_for(base));

        let err = client
            .complete(&[ChatMessage::user("hi")], ModelType::Fast, 0.3, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ClauseError::InsufficientCredits(_)));
    }

    #[tokio::test]
    async fn test_server_error_exhausts_models() {
        let base = spawn_stub("500 Internal Server Error", "{}".to_string()).await;
        let client = client(&config_for(base));

        let err = client
            .complete(&[ChatMessage::user("hi")], ModelType::Fast, 0.3, 100)
            .await
            .unwrap_err();
        match err {
            ClauseError::LlmApi(message) => assert!(message.contains("All models failed")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_structured_completion_parses() {
        let base = spawn_stub("200 OK", chat_body("```json\n{\"risks\": []}\n```")).await;
        let client = client(&config_for(base));

        let list: CompoundRiskList = client
            .complete_structured(&[ChatMessage::user("analyze")], ModelType::Structured, 0.2)
            .await
            .expect("structured");
        assert!(list.risks.is_empty());
    }

    #[tokio::test]
    async fn test_structured_retries_then_reports_attempts() {
        let base = spawn_stub("200 OK", chat_body("not json, sorry")).await;
        let client = client(&config_for(base));

        let err = client
            .complete_structured::<CompoundRiskList>(
                &[ChatMessage::user("analyze")],
                ModelType::Structured,
                0.2,
            )
            .await
            .unwrap_err();
        match err {
            ClauseError::StructuredParse { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
