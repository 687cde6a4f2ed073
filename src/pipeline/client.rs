//! Model client: send extracted text to a reasoning model, get an envelope back.
//!
//! Three transports implement [`ModelClient`]:
//!
//! | Client | Credential | Wire format |
//! |--------|------------|-------------|
//! | [`ChatCompletionsClient`] | held here, `Authorization: Bearer` | OpenAI-compatible `/chat/completions` |
//! | [`ProxyClient`] | held by the proxy | `POST {"text": ...}` → choices envelope |
//! | [`ProviderClient`] | resolved by `edgequake-llm` | provider-native, re-wrapped as an envelope |
//!
//! All prompt text lives in [`crate::prompts`]; this module only deals with
//! transport and the envelope shape. Failures are classified so callers can
//! tell a dead network from a rejected key from a model that produced nothing.

use crate::config::{AnalysisConfig, Transport};
use crate::error::AnalysisError;
use crate::prompts::user_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Characters of a non-JSON response body kept in the error.
const ENVELOPE_SNIPPET_CHARS: usize = 200;

/// Error code the proxy attaches when it has no credential.
pub const CREDENTIAL_MISSING_CODE: &str = "credential_missing";

// ── Wire types ───────────────────────────────────────────────────────────────

/// Body accepted by the proxy: the extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
}

impl AnalysisRequest {
    /// `None` when the text is blank.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self { text })
        }
    }
}

/// The completion endpoint's response, as far as this crate cares.
///
/// Only the first choice is ever consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ChoiceMessage,
}

/// An explicit `null` decodes the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// DeepSeek-R1 style reasoning trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// The first choice, split into answer text and optional reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAnswer {
    pub content: String,
    pub reasoning: Option<String>,
}

impl ModelEnvelope {
    /// A single-choice envelope.
    pub fn from_answer(content: impl Into<String>, reasoning: Option<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(content.into()),
                    reasoning_content: reasoning,
                },
            }],
        }
    }

    /// Take the first choice.
    ///
    /// # Errors
    /// [`AnalysisError::EmptyResponse`] when there is no choice or its
    /// content is absent or blank.
    pub fn into_answer(self) -> Result<ModelAnswer, AnalysisError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or(AnalysisError::EmptyResponse)?;
        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)?;
        let reasoning = choice
            .message
            .reasoning_content
            .filter(|r| !r.trim().is_empty());
        Ok(ModelAnswer { content, reasoning })
    }
}

/// One chat turn in an OpenAI-compatible request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

/// OpenAI-compatible `/chat/completions` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

// ── Trait ────────────────────────────────────────────────────────────────────

/// Sends document text to a model and returns the raw response envelope.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, raw_text: &str) -> Result<ModelEnvelope, AnalysisError>;

    /// Where requests go (URL or provider name), for logs.
    fn target(&self) -> &str;
}

/// Pick a client for `config`, from most-specific to least-specific:
///
/// 1. pre-built provider (`config.provider`)
/// 2. named `edgequake-llm` provider (`config.provider_name`) with `config.model`
/// 3. [`Transport::Proxy`] → [`ProxyClient`]
/// 4. [`Transport::Direct`] → [`ChatCompletionsClient`]
pub fn client_from_config(config: &AnalysisConfig) -> Result<Arc<dyn ModelClient>, AnalysisError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderClient::new(
            Arc::clone(provider),
            "custom",
            config,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            AnalysisError::Provider {
                provider: name.clone(),
                message: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderClient::new(provider, name, config)));
    }

    match config.transport {
        Transport::Proxy => Ok(Arc::new(ProxyClient::from_config(config)?)),
        Transport::Direct => Ok(Arc::new(ChatCompletionsClient::from_config(config)?)),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, AnalysisError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalysisError::Internal(format!("Failed to build HTTP client: {e}")))
}

fn network_failure(endpoint: &str, e: reqwest::Error) -> AnalysisError {
    let detail = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    AnalysisError::NetworkFailure {
        endpoint: endpoint.to_string(),
        detail,
    }
}

/// Read status and body; a body that cannot be read is a network failure.
async fn read_body(endpoint: &str, response: reqwest::Response) -> Result<(u16, String), AnalysisError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| network_failure(endpoint, e))?;
    Ok((status, body))
}

/// Decode a 2xx body into an envelope.
pub fn decode_envelope(body: &str) -> Result<ModelEnvelope, AnalysisError> {
    serde_json::from_str(body).map_err(|e| AnalysisError::MalformedOutput {
        reason: format!("response envelope is not valid JSON: {e}"),
        snippet: body.chars().take(ENVELOPE_SNIPPET_CHARS).collect(),
    })
}

// ── 1. Direct OpenAI-compatible endpoint ─────────────────────────────────────

/// Calls an OpenAI-compatible `/chat/completions` endpoint with a bearer key.
///
/// Only for trusted processes: the key lives in this struct.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
    json_mode: bool,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            http: http_client(config.request_timeout_secs)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            system_prompt: config.effective_system_prompt().to_string(),
            json_mode: config.json_mode,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// The request body for `raw_text`.
    pub fn build_request(&self, raw_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatTurn {
                    role: "system".into(),
                    content: self.system_prompt.clone(),
                },
                ChatTurn {
                    role: "user".into(),
                    content: user_prompt(raw_text),
                },
            ],
            response_format: self.json_mode.then(|| ResponseFormat {
                kind: "json_object".into(),
            }),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// POST the completion request and return the raw 2xx body.
    ///
    /// The proxy forwards this body verbatim; [`ModelClient::send`] decodes it.
    pub async fn post_completion(&self, raw_text: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnalysisError::CredentialMissing {
                hint: "Set API_KEY (or --api-key), or route requests through the proxy with --proxy."
                    .to_string(),
            })?;

        let request = self.build_request(raw_text);
        info!(
            "Requesting analysis from {} (model {}, {} chars)",
            self.endpoint,
            self.model,
            raw_text.chars().count()
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| network_failure(&self.endpoint, e))?;

        let (status, body) = read_body(&self.endpoint, response).await?;
        debug!(
            "Endpoint answered HTTP {} with {} bytes in {:?}",
            status,
            body.len(),
            start.elapsed()
        );

        if !(200..300).contains(&status) {
            return Err(AnalysisError::UpstreamHttp { status, body });
        }
        Ok(body)
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn send(&self, raw_text: &str) -> Result<ModelEnvelope, AnalysisError> {
        let body = self.post_completion(raw_text).await?;
        decode_envelope(&body)
    }

    fn target(&self) -> &str {
        &self.endpoint
    }
}

// ── 2. Proxy ─────────────────────────────────────────────────────────────────

/// Posts `{"text": ...}` to a proxy that owns the credential.
pub struct ProxyClient {
    http: reqwest::Client,
    url: String,
}

impl ProxyClient {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            http: http_client(config.request_timeout_secs)?,
            url: config.proxy_url.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for ProxyClient {
    async fn send(&self, raw_text: &str) -> Result<ModelEnvelope, AnalysisError> {
        info!("Requesting analysis via proxy {}", self.url);
        let response = self
            .http
            .post(&self.url)
            .json(&AnalysisRequest {
                text: raw_text.to_string(),
            })
            .send()
            .await
            .map_err(|e| network_failure(&self.url, e))?;

        let (status, body) = read_body(&self.url, response).await?;
        if (200..300).contains(&status) {
            return decode_envelope(&body);
        }

        if status == 500 {
            if let Some(message) = credential_missing_message(&body) {
                return Err(AnalysisError::CredentialMissing {
                    hint: format!("The proxy at {} reports: {}", self.url, message),
                });
            }
        }
        Err(AnalysisError::UpstreamHttp { status, body })
    }

    fn target(&self) -> &str {
        &self.url
    }
}

/// The proxy's error message when its body carries the credential-missing code.
fn credential_missing_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if value["code"].as_str() != Some(CREDENTIAL_MISSING_CODE) {
        return None;
    }
    Some(
        value["error"]
            .as_str()
            .unwrap_or("API key is not configured")
            .to_string(),
    )
}

// ── 3. edgequake-llm provider ────────────────────────────────────────────────

/// Adapts any `edgequake-llm` provider to [`ModelClient`].
///
/// Providers return plain content, so the envelope has one choice and no
/// reasoning trace.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
    system_prompt: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>, config: &AnalysisConfig) -> Self {
        Self {
            provider,
            name: name.into(),
            system_prompt: config.effective_system_prompt().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn send(&self, raw_text: &str) -> Result<ModelEnvelope, AnalysisError> {
        let prompt = user_prompt(raw_text);
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(&prompt),
        ];
        let options = CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        };

        info!("Requesting analysis from provider '{}'", self.name);
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| AnalysisError::Provider {
                provider: self.name.clone(),
                message: format!("{e}"),
            })?;
        debug!(
            "Provider '{}': {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelEnvelope::from_answer(response.content, None))
    }

    fn target(&self) -> &str {
        &self.name
    }
}
