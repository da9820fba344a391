//! Gateway Settings
//!
//! Connection settings for the OpenAI-compatible chat-completions endpoint and
//! the credential rules that decide whether a call may leave the process.
//! The HTTP client factory that consumes `ProxyConfig` lives in the
//! `uber-codegen-llm` crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Placeholder value shipped in sample `.env` files; never a usable key.
pub const PLACEHOLDER_API_KEY: &str = "your-groq-api-key-here";

/// Keys of this length or shorter are treated as absent.
pub const MIN_API_KEY_LEN: usize = 10;

/// Returns true when `key` looks like a real credential.
pub fn is_valid_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key.len() > MIN_API_KEY_LEN && key != PLACEHOLDER_API_KEY
}

/// Outbound proxy for provider traffic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Full proxy URL, e.g. `http://127.0.0.1:8080` or `socks5://host:1080`
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Held in memory only.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

/// Settings for the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Server-configured credential. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Temperature for classify/plan/validate/test/secure calls
    pub analysis_temperature: f32,
    /// Temperature for streamed code generation
    pub generation_temperature: f32,
    /// Upper bound for a single non-streaming call
    pub timeout_secs: u64,
    /// Upper bound for a whole streamed generation
    pub stream_timeout_secs: u64,
    pub proxy: Option<ProxyConfig>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            analysis_temperature: 0.3,
            generation_temperature: 0.7,
            timeout_secs: 90,
            stream_timeout_secs: 120,
            proxy: None,
        }
    }
}

impl GatewaySettings {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Pick the credential for one call.
    ///
    /// A request override wins only when it is longer than `MIN_API_KEY_LEN`;
    /// otherwise the configured key is used. Returns `None` when the chosen
    /// key fails [`is_valid_key`].
    pub fn resolve_key(&self, override_key: Option<&str>) -> Option<String> {
        let chosen = match override_key.map(str::trim) {
            Some(k) if k.len() > MIN_API_KEY_LEN => Some(k),
            _ => self.api_key.as_deref().map(str::trim),
        }?;
        is_valid_key(chosen).then(|| chosen.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}
