// Advisory providers
//
// The orchestrator only sees the AdvisoryProvider trait. HttpProvider
// implements it for the two supported wire shapes:
//
// - Gemini generateContent (`candidates[0].content.parts[*].text`)
// - OpenAI-style chat completions (`choices[0].message.content`)

use crate::advisory::error::AdvisoryError;
use crate::advisory::template::RequestKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "QORCOMPARE_API_KEY";

/// Default Gemini API endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default chat-completions endpoint
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1";

/// Transport-level timeout; the orchestrator applies the real per-attempt deadline
const TRANSPORT_TIMEOUT_SECS: u64 = 300;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Rendered request handed to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryPayload {
    pub request_kind: RequestKind,
    pub system: String,
    pub prompt: String,
}

/// A backend that turns a rendered prompt into advisory text
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Perform one call; retries are the caller's business
    async fn invoke(&self, payload: &AdvisoryPayload) -> Result<String, AdvisoryError>;
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_URL.to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_chat_url() -> String {
    DEFAULT_CHAT_URL.to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// Which provider to call and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    Gemini {
        #[serde(default = "default_gemini_url")]
        base_url: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    ChatCompletions {
        #[serde(default = "default_chat_url")]
        base_url: String,
        #[serde(default = "default_chat_model")]
        model: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
}

impl ProviderConfig {
    pub fn gemini(model: impl Into<String>) -> Self {
        ProviderConfig::Gemini {
            base_url: default_gemini_url(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn chat_completions(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderConfig::ChatCompletions {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: default_temperature(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Gemini { .. } => "gemini",
            ProviderConfig::ChatCompletions { .. } => "chat_completions",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Gemini { model, .. } | ProviderConfig::ChatCompletions { model, .. } => {
                model
            }
        }
    }

    fn configured_key(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::ChatCompletions { api_key, .. } => api_key.as_deref(),
        }
    }

    /// Configured key, else the `QORCOMPARE_API_KEY` environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.configured_key()
            .map(str::to_string)
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Endpoint URL for a completion request
    pub fn endpoint_url(&self) -> String {
        match self {
            ProviderConfig::Gemini {
                base_url, model, ..
            } => format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            ProviderConfig::ChatCompletions { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }

    /// JSON request body for a payload
    pub fn request_body(&self, payload: &AdvisoryPayload) -> Value {
        match self {
            ProviderConfig::Gemini { .. } => json!({
                "system_instruction": { "parts": [{ "text": payload.system }] },
                "contents": [{ "role": "user", "parts": [{ "text": payload.prompt }] }],
            }),
            ProviderConfig::ChatCompletions {
                model, temperature, ..
            } => json!({
                "model": model,
                "temperature": temperature,
                "messages": [
                    { "role": "system", "content": payload.system },
                    { "role": "user", "content": payload.prompt },
                ],
            }),
        }
    }

    /// Advisory text from a response body
    pub fn extract_text(&self, body: &Value) -> Result<String, AdvisoryError> {
        let text = match self {
            ProviderConfig::Gemini { .. } => body["candidates"][0]["content"]["parts"]
                .as_array()
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|part| part["text"].as_str())
                        .collect::<Vec<_>>()
                        .concat()
                }),
            ProviderConfig::ChatCompletions { .. } => body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string),
        };

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(AdvisoryError::MalformedResponse(
                "response text is empty".to_string(),
            )),
            None => Err(AdvisoryError::MalformedResponse(format!(
                "no text field in {} response",
                self.name()
            ))),
        }
    }
}

/// Provider backed by an HTTP API
#[derive(Debug, Clone)]
pub struct HttpProvider {
    config: ProviderConfig,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpProvider {
    /// Build a provider, resolving the API key now
    ///
    /// # Errors
    /// `AuthFailure` when Gemini has no key; `Internal` when the HTTP
    /// client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, AdvisoryError> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() && matches!(config, ProviderConfig::Gemini { .. }) {
            return Err(AdvisoryError::AuthFailure(format!(
                "no API key configured (set provider.api_key or {})",
                API_KEY_ENV
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AdvisoryError::Internal(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl AdvisoryProvider for HttpProvider {
    fn name(&self) -> &str {
        self.config.name()
    }

    #[instrument(skip(self, payload), fields(provider = self.config.name(), kind = %payload.request_kind))]
    async fn invoke(&self, payload: &AdvisoryPayload) -> Result<String, AdvisoryError> {
        let url = self.config.endpoint_url();
        debug!(%url, model = self.config.model(), "Sending advisory request");

        let mut request = self
            .http_client
            .post(&url)
            .json(&self.config.request_body(payload));
        if let Some(key) = &self.api_key {
            request = match self.config {
                ProviderConfig::Gemini { .. } => request.header("x-goog-api-key", key),
                ProviderConfig::ChatCompletions { .. } => request.bearer_auth(key),
            };
        }

        let response = request.send().await.map_err(|e| {
            warn!(%e, "advisory request failed");
            AdvisoryError::from_transport(&e, Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdvisoryError::AuthFailure(format!(
                "{} rejected the API key",
                self.config.name()
            )));
        }
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(
                message
                    .char_indices()
                    .nth(MAX_ERROR_BODY)
                    .map_or(message.len(), |(i, _)| i),
            );
            warn!(%status, "provider returned error status");
            return Err(AdvisoryError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdvisoryError::MalformedResponse(e.to_string()))?;
        self.config.extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn payload() -> AdvisoryPayload {
        AdvisoryPayload {
            request_kind: RequestKind::Summary,
            system: "be brief".into(),
            prompt: "compare".into(),
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let gemini = ProviderConfig::Gemini {
            base_url: "http://localhost:9000/".into(),
            model: "gemini-pro".into(),
            api_key: None,
        };
        assert_eq!(
            gemini.endpoint_url(),
            "http://localhost:9000/v1beta/models/gemini-pro:generateContent"
        );

        let chat = ProviderConfig::chat_completions("http://localhost:8080/v1/", "local");
        assert_eq!(chat.endpoint_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_bodies() {
        let gemini = ProviderConfig::gemini("gemini-pro").request_body(&payload());
        assert_eq!(gemini["contents"][0]["parts"][0]["text"], "compare");
        assert_eq!(gemini["system_instruction"]["parts"][0]["text"], "be brief");

        let chat = ProviderConfig::chat_completions("http://x", "local").request_body(&payload());
        assert_eq!(chat["model"], "local");
        assert_eq!(chat["messages"][0]["role"], "system");
        assert_eq!(chat["messages"][1]["content"], "compare");
    }

    #[test]
    fn test_extract_gemini_text() {
        let config = ProviderConfig::gemini("gemini-pro");
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] } }]
        });
        assert_eq!(config.extract_text(&body).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_chat_text() {
        let config = ProviderConfig::chat_completions("http://x", "local");
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "Looks good" } }] });
        assert_eq!(config.extract_text(&body).unwrap(), "Looks good");
    }

    #[test]
    fn test_missing_text_is_malformed() {
        let config = ProviderConfig::chat_completions("http://x", "local");
        let err = config.extract_text(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, AdvisoryError::MalformedResponse(_)));

        let err = config
            .extract_text(&json!({ "choices": [{ "message": { "content": "  " } }] }))
            .unwrap_err();
        assert!(matches!(err, AdvisoryError::MalformedResponse(_)));
    }

    #[test]
    fn test_provider_config_from_toml() {
        let config: ProviderConfig = toml::from_str(
            r#"
            type = "chat_completions"
            base_url = "http://localhost:8080/v1"
            model = "qwen"
            "#,
        )
        .unwrap();
        assert_eq!(config.name(), "chat_completions");
        assert_eq!(config.model(), "qwen");

        let gemini: ProviderConfig = toml::from_str(r#"type = "gemini""#).unwrap();
        assert_eq!(gemini.endpoint_url(), format!(
            "{}/v1beta/models/gemini-1.5-flash:generateContent",
            DEFAULT_GEMINI_URL
        ));

        assert!(toml::from_str::<ProviderConfig>(r#"type = "carrier_pigeon""#).is_err());
    }

    #[test]
    #[serial]
    fn test_api_key_env_fallback() {
        std::env::set_var(API_KEY_ENV, "from-env");
        let config = ProviderConfig::gemini("gemini-pro");
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-env"));

        let configured = ProviderConfig::Gemini {
            base_url: DEFAULT_GEMINI_URL.into(),
            model: "gemini-pro".into(),
            api_key: Some("configured".into()),
        };
        assert_eq!(configured.resolve_api_key().as_deref(), Some("configured"));
        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    #[serial]
    fn test_gemini_without_key_is_auth_failure() {
        std::env::remove_var(API_KEY_ENV);
        let err = HttpProvider::new(ProviderConfig::gemini("gemini-pro")).unwrap_err();
        assert!(matches!(err, AdvisoryError::AuthFailure(_)));

        // Local chat servers usually need no key
        let provider =
            HttpProvider::new(ProviderConfig::chat_completions("http://localhost:8080/v1", "local"))
                .unwrap();
        assert_eq!(provider.name(), "chat_completions");
    }
}
