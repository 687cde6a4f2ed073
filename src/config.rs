//! Configuration types for document analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. One struct holds every knob: transport,
//! endpoint, model, credential, extraction bounds and parser strictness.

use crate::error::AnalysisError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default OpenAI-compatible completion endpoint (CSTCloud Uni-API).
pub const DEFAULT_ENDPOINT: &str = "https://uni-api.cstcloud.cn/v1/chat/completions";

/// Default reasoning model.
pub const DEFAULT_MODEL: &str = "deepseek-r1";

/// Default proxy route used by [`Transport::Proxy`].
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8788/api/analyze";

/// Configuration for a document analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_paper_digest::{AnalysisConfig, Transport};
///
/// let config = AnalysisConfig::builder()
///     .transport(Transport::Proxy)
///     .proxy_url("http://localhost:8788/api/analyze")
///     .max_pages(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// How requests reach the model. Default: [`Transport::Direct`].
    pub transport: Transport,

    /// OpenAI-compatible `/chat/completions` URL used by [`Transport::Direct`].
    pub endpoint: String,

    /// Proxy route used by [`Transport::Proxy`].
    pub proxy_url: String,

    /// Model identifier sent in the request body. Default: `deepseek-r1`.
    pub model: String,

    /// Bearer credential for [`Transport::Direct`].
    ///
    /// Only ever set on trusted, server-side deployments. A missing key is
    /// reported as [`AnalysisError::CredentialMissing`] before any request
    /// is sent.
    pub api_key: Option<String>,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic", "ollama").
    /// Takes precedence over `transport` when set.
    pub provider_name: Option<String>,

    /// Pre-constructed `edgequake-llm` provider. Takes precedence over
    /// everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom system prompt. If None, uses the built-in instruction.
    pub system_prompt: Option<String>,

    /// Ask the endpoint for `response_format: {"type": "json_object"}`.
    /// Default: true.
    ///
    /// This is a hint. The parser never assumes it was honoured.
    pub json_mode: bool,

    /// Sampling temperature. None leaves the endpoint default in place.
    pub temperature: Option<f32>,

    /// Completion token cap. None leaves the endpoint default in place.
    pub max_tokens: Option<usize>,

    /// Maximum number of PDF pages whose text is sent to the model. Default: 10.
    pub max_pages: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Characters of raw model output kept in a malformed-output error. Default: 200.
    pub snippet_chars: usize,

    /// Treat a blank `phageDisplaySection` as malformed output. Default: false.
    pub require_specialized_section: bool,

    /// Recovery strategy for answers that do not decode after fence stripping.
    pub recovery: OutputRecovery,

    /// HTTP client timeout for model and proxy calls in seconds. Default: 600.
    ///
    /// Reasoning models routinely think for several minutes on a full paper.
    pub request_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            provider_name: None,
            provider: None,
            system_prompt: None,
            json_mode: true,
            temperature: None,
            max_tokens: None,
            max_pages: 10,
            password: None,
            snippet_chars: 200,
            require_specialized_section: false,
            recovery: OutputRecovery::default(),
            request_timeout_secs: 600,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("transport", &self.transport)
            .field("endpoint", &self.endpoint)
            .field("proxy_url", &self.proxy_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("json_mode", &self.json_mode)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_pages", &self.max_pages)
            .field("snippet_chars", &self.snippet_chars)
            .field("require_specialized_section", &self.require_specialized_section)
            .field("recovery", &self.recovery)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system prompt that will actually be sent.
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::SYSTEM_INSTRUCTION)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the bearer credential. Blank keys are treated as absent.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn json_mode(mut self, v: bool) -> Self {
        self.config.json_mode = v;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn snippet_chars(mut self, n: usize) -> Self {
        self.config.snippet_chars = n.max(1);
        self
    }

    pub fn require_specialized_section(mut self, v: bool) -> Self {
        self.config.require_specialized_section = v;
        self
    }

    pub fn recovery(mut self, recovery: OutputRecovery) -> Self {
        self.config.recovery = recovery;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("Model must not be empty".into()));
        }
        match c.transport {
            Transport::Direct if !is_http_url(&c.endpoint) => {
                return Err(AnalysisError::InvalidConfig(format!(
                    "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                    c.endpoint
                )));
            }
            Transport::Proxy if !is_http_url(&c.proxy_url) => {
                return Err(AnalysisError::InvalidConfig(format!(
                    "Proxy URL must be an HTTP/HTTPS URL, got '{}'",
                    c.proxy_url
                )));
            }
            _ => {}
        }
        if c.request_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the model request leaves this process.
///
/// | Transport | Credential held by | Use case |
/// |-----------|--------------------|----------|
/// | `Direct`  | this process       | Trusted server-side deployments, CLI |
/// | `Proxy`   | the proxy          | Untrusted clients (browser, desktop) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transport {
    /// POST the completion request straight to `endpoint` with a bearer key. (default)
    #[default]
    Direct,
    /// POST `{"text": ...}` to `proxy_url`; the proxy attaches the key.
    Proxy,
}

/// What the parser does when the answer does not decode after fence stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputRecovery {
    /// Strip leading/trailing fence markers only. (default)
    #[default]
    StripFences,
    /// Additionally fall back to the first balanced `{...}` object in the answer.
    FirstJsonObject,
}
