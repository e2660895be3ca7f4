//! LLM provider integrations for SQL generation.
//!
//! This module provides one [`LlmClient::generate`] capability over a closed
//! set of providers. The provider is chosen once, at construction, from a
//! selector string; an unknown selector is a configuration error and never
//! reaches the network.
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication | Transport |
//! |----------|----------|----------------|-----------|
//! | OpenAI | `{openai_url}/chat/completions` | Bearer token | Blocking |
//! | Anthropic | `{anthropic_url}/messages` | x-api-key header | Blocking |
//! | Ollama | `{ollama_url}/api/generate` | None | Streaming |
//!
//! # Retry Behavior
//!
//! Blocking providers retry transient errors (timeouts, connection failures,
//! 429, 5xx) with exponential backoff. The streaming provider never retries;
//! connection failures, timeouts and missing models surface as distinct
//! messages instead.
//!
//! # Example
//!
//! ```
//! use sql_query_generator::{
//!     config::RetryConfig,
//!     llm::{LlmClient, LlmProvider}
//! };
//!
//! let provider = LlmProvider::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model:    "llama3.2".into()
//! };
//!
//! let client = LlmClient::with_retry_config(provider, RetryConfig::default());
//! ```

pub mod stream;

use std::{fmt, str::FromStr, time::Duration};

use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use self::stream::consume_stream;
use crate::{
    config::{Config, LlmConfig, RetryConfig},
    error::{
        AppError, AppResult, config_error, generation_failed, http_error, ollama_transport_error,
        unsupported_provider
    },
    sanitize::sanitize_sql
};

/// Sampling temperature for blocking providers.
const BLOCKING_TEMPERATURE: f32 = 0.0;

/// Sampling settings for the streaming provider.
const STREAMING_TEMPERATURE: f32 = 0.1;
const STREAMING_TOP_P: f32 = 0.1;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama
}

impl ProviderKind {
    /// Get default model for provider
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-3.5-turbo",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.2"
        }
    }

    /// Whether the provider delivers its answer as a chunk stream
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Ollama)
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open-ai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(unsupported_provider(s))
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama"
        };
        f.write_str(name)
    }
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// OpenAI chat completions
    OpenAI {
        /// API key (sk-...)
        api_key:  String,
        /// Model identifier (e.g., "gpt-3.5-turbo")
        model:    String,
        /// API root (e.g., "https://api.openai.com/v1")
        base_url: String
    },
    /// Anthropic messages API
    Anthropic {
        api_key:  String,
        model:    String,
        base_url: String
    },
    /// Local Ollama instance, always streamed
    Ollama {
        /// Base URL (e.g., "http://localhost:11434")
        base_url: String,
        /// Model name (e.g., "llama3.2", "codellama")
        model:    String
    }
}

impl LlmProvider {
    /// Resolve the provider from configuration.
    ///
    /// The selector defaults to `openai`. Unknown selectors fail with an
    /// unsupported-provider error; OpenAI and Anthropic require an API key.
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        let kind: ProviderKind = config.provider.as_deref().unwrap_or("openai").parse()?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string());
        match kind {
            ProviderKind::OpenAI => Ok(Self::OpenAI {
                api_key: require_api_key(config, kind)?,
                model,
                base_url: config.openai_url.clone()
            }),
            ProviderKind::Anthropic => Ok(Self::Anthropic {
                api_key: require_api_key(config, kind)?,
                model,
                base_url: config.anthropic_url.clone()
            }),
            ProviderKind::Ollama => Ok(Self::Ollama {
                base_url: config.ollama_url.clone(),
                model
            })
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAI {
                ..
            } => ProviderKind::OpenAI,
            Self::Anthropic {
                ..
            } => ProviderKind::Anthropic,
            Self::Ollama {
                ..
            } => ProviderKind::Ollama
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI {
                model, ..
            }
            | Self::Anthropic {
                model, ..
            }
            | Self::Ollama {
                model, ..
            } => model
        }
    }
}

fn require_api_key(config: &LlmConfig, kind: ProviderKind) -> AppResult<String> {
    config.api_key.clone().ok_or_else(|| {
        config_error(format!(
            "API key required for {} (use --api-key or LLM_API_KEY)",
            kind
        ))
    })
}

/// HTTP client for SQL generation.
///
/// Handles provider-specific request formatting and response parsing, and
/// runs every answer through [`sanitize_sql`].
pub struct LlmClient {
    provider:     LlmProvider,
    client:       reqwest::Client,
    retry_config: RetryConfig
}

/// Failed blocking call, classified for retry from the status code or the
/// transport error kind.
struct CallFailure {
    error:     AppError,
    retryable: bool
}

impl CallFailure {
    fn permanent(error: AppError) -> Self {
        Self {
            error,
            retryable: false
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        let retryable = err.is_timeout() || err.is_connect();
        Self {
            error: http_error(err),
            retryable
        }
    }

    fn status(status: StatusCode, error: AppError) -> Self {
        Self {
            error,
            retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model:       String,
    messages:    Vec<ChatMessage>,
    temperature: f32
}

#[derive(Serialize)]
struct ChatMessage {
    role:    String,
    content: String
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: String
}

#[derive(Serialize)]
struct AnthropicRequest {
    model:       String,
    max_tokens:  u32,
    temperature: f32,
    messages:    Vec<ChatMessage>
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String
}

#[derive(Serialize)]
struct OllamaRequest {
    model:   String,
    prompt:  String,
    stream:  bool,
    options: OllamaOptions
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p:       f32
}

impl LlmClient {
    /// Create new LLM client with default retry configuration
    pub fn new(provider: LlmProvider) -> Self {
        Self::with_retry_config(provider, RetryConfig::default())
    }

    /// Create new LLM client with custom retry configuration
    pub fn with_retry_config(provider: LlmProvider, retry_config: RetryConfig) -> Self {
        Self::build(
            provider,
            retry_config,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        )
    }

    /// Create client from loaded configuration, validating the provider
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let provider = LlmProvider::from_config(&config.llm)?;
        Ok(Self::build(
            provider,
            config.retry.clone(),
            Duration::from_secs(config.llm.timeout_secs)
        ))
    }

    fn build(provider: LlmProvider, retry_config: RetryConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            provider,
            client,
            retry_config
        }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Generate one sanitized SQL statement for `prompt`.
    pub async fn generate(&self, prompt: &str) -> AppResult<String> {
        self.generate_stream(prompt, |_| {}).await
    }

    /// Generate one sanitized SQL statement, reporting intermediate
    /// statements to `on_partial` as they form.
    ///
    /// Intermediate statements are for display only. Blocking providers call
    /// `on_partial` once with the final statement.
    pub async fn generate_stream<F>(&self, prompt: &str, mut on_partial: F) -> AppResult<String>
    where
        F: FnMut(&str)
    {
        tracing::info!(
            provider = %self.provider.kind(),
            model = self.provider.model(),
            "generating SQL"
        );
        let sql = match &self.provider {
            LlmProvider::OpenAI {
                api_key,
                model,
                base_url
            } => {
                let raw = self
                    .call_with_retry(|| self.call_openai(base_url, api_key, model, prompt))
                    .await?;
                let sql = sanitize_sql(raw.trim());
                if !sql.is_empty() {
                    on_partial(&sql);
                }
                sql
            }
            LlmProvider::Anthropic {
                api_key,
                model,
                base_url
            } => {
                let raw = self
                    .call_with_retry(|| self.call_anthropic(base_url, api_key, model, prompt))
                    .await?;
                let sql = sanitize_sql(raw.trim());
                if !sql.is_empty() {
                    on_partial(&sql);
                }
                sql
            }
            LlmProvider::Ollama {
                base_url,
                model
            } => {
                self.stream_ollama(base_url, model, prompt, &mut on_partial)
                    .await?
            }
        };
        if sql.is_empty() {
            return Err(generation_failed("No valid SQL query was generated"));
        }
        tracing::info!(sql = %sql, "generated SQL query");
        Ok(sql)
    }

    async fn call_with_retry<F, Fut>(&self, mut call: F) -> AppResult<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, CallFailure>>
    {
        let mut last_error = None;
        let mut delay = self.retry_config.initial_delay_ms;
        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = self.retry_config.max_retries + 1,
                    delay_ms = delay,
                    "retrying LLM request"
                );
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * self.retry_config.backoff_factor) as u64)
                    .min(self.retry_config.max_delay_ms);
            }
            match call().await {
                Ok(result) => return Ok(result),
                Err(failure) if failure.retryable => last_error = Some(failure.error),
                Err(failure) => return Err(failure.error)
            }
        }
        Err(last_error.unwrap_or_else(|| generation_failed("All retry attempts failed")))
    }

    async fn call_openai(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        prompt: &str
    ) -> Result<String, CallFailure> {
        let request = OpenAIRequest {
            model:       model.to_string(),
            messages:    vec![ChatMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }],
            temperature: BLOCKING_TEMPERATURE
        };
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(CallFailure::transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallFailure::status(
                status,
                generation_failed(format!("OpenAI API error {}: {}", status, text))
            ));
        }
        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::permanent(http_error(e)))?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CallFailure::permanent(generation_failed("Empty response from OpenAI")))
    }

    async fn call_anthropic(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        prompt: &str
    ) -> Result<String, CallFailure> {
        let request = AnthropicRequest {
            model:       model.to_string(),
            max_tokens:  4096,
            temperature: BLOCKING_TEMPERATURE,
            messages:    vec![ChatMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let url = format!("{}/messages", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(CallFailure::transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallFailure::status(
                status,
                generation_failed(format!("Anthropic API error {}: {}", status, text))
            ));
        }
        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::permanent(http_error(e)))?;
        result
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| {
                CallFailure::permanent(generation_failed("Empty response from Anthropic"))
            })
    }

    async fn stream_ollama<F>(
        &self,
        base_url: &str,
        model: &str,
        prompt: &str,
        on_partial: &mut F
    ) -> AppResult<String>
    where
        F: FnMut(&str)
    {
        let request = OllamaRequest {
            model:   model.to_string(),
            prompt:  prompt.to_string(),
            stream:  true,
            options: OllamaOptions {
                temperature: STREAMING_TEMPERATURE,
                top_p:       STREAMING_TOP_P
            }
        };
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        tracing::debug!(url = %url, model, "sending streaming request to Ollama");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ollama_transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(generation_failed(format!(
                "Model {} not found. Please make sure it's installed.",
                model
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(generation_failed(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ollama_transport_error));
        consume_stream(body, on_partial).await
    }
}
