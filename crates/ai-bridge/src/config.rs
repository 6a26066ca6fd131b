//! Gemini Live connection settings

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Bidirectional streaming endpoint of the Generative Language API
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Native-audio model used when none is configured
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-latest";

pub const DEFAULT_VOICE: &str = "Puck";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for SIP voice calls.";

/// First user turn sent after the session is set up, so the model speaks first
pub const DEFAULT_GREETING: &str =
    "Hello. You are an assistant, pretend you're being called on the phone.";

/// Environment variables consulted, in order, when no key is configured
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Settings for the AI streaming bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// WebSocket endpoint, without the `key` query parameter
    pub endpoint: String,
    /// API key; empty falls back to the environment
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub system_prompt: String,
    pub greeting: String,
    /// Reset the link when nothing was sent or received for this long
    pub idle_timeout_ms: u64,
    /// Send a silent frame when nothing was sent for this long
    pub keepalive_interval_ms: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    /// Pause after tearing a link down
    pub reset_pause_ms: u64,
    /// Upper bound on opening the socket and completing setup
    pub connect_timeout_ms: u64,
    /// Raw model audio chunks waiting to be reframed
    pub inbound_queue_capacity: usize,
    /// PCMU frames waiting to be handed to the media session
    pub outbound_queue_capacity: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            idle_timeout_ms: 150_000,
            keepalive_interval_ms: 20_000,
            reconnect_initial_ms: 2_000,
            reconnect_max_ms: 30_000,
            reset_pause_ms: 500,
            connect_timeout_ms: 10_000,
            inbound_queue_capacity: 200,
            outbound_queue_capacity: 200,
        }
    }
}

impl AiConfig {
    /// Configured key, or the first non-empty key from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        API_KEY_ENV_VARS.iter().find_map(|name| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    /// AI bridging is possible only with a key
    pub fn is_enabled(&self) -> bool {
        self.resolved_api_key().is_some()
    }

    /// Model name in the `models/...` form the setup message expects
    pub fn model_name(&self) -> String {
        normalize_model(&self.model)
    }

    pub fn voice_name(&self) -> &str {
        non_empty_or(&self.voice, DEFAULT_VOICE)
    }

    pub fn system_instruction(&self) -> &str {
        non_empty_or(&self.system_prompt, DEFAULT_SYSTEM_PROMPT)
    }

    /// Full connection URL including the key. Never log this.
    pub fn connect_url(&self) -> Result<String> {
        let key = self.resolved_api_key().ok_or(BridgeError::MissingApiKey)?;
        let endpoint = self.endpoint.trim();
        let mut url = Url::parse(endpoint).map_err(|e| {
            BridgeError::InvalidConfig(format!("endpoint {endpoint:?} is not a URL: {e}"))
        })?;
        if !matches!(url.scheme(), "wss" | "ws") {
            return Err(BridgeError::InvalidConfig(format!(
                "endpoint must be a ws:// or wss:// URL, got {endpoint:?}"
            )));
        }
        url.query_pairs_mut().append_pair("key", &key);
        Ok(url.into())
    }

    /// Whether switching from `self` to `other` invalidates an open session
    pub fn requires_reconnect(&self, other: &AiConfig) -> bool {
        self.model_name() != other.model_name()
            || self.voice_name() != other.voice_name()
            || self.system_instruction() != other.system_instruction()
            || self.endpoint.trim() != other.endpoint.trim()
            || self.resolved_api_key() != other.resolved_api_key()
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconnect_initial_ms == 0 || self.reconnect_max_ms < self.reconnect_initial_ms {
            return Err(BridgeError::InvalidConfig(format!(
                "reconnect backoff {}..{} ms is not a valid range",
                self.reconnect_initial_ms, self.reconnect_max_ms
            )));
        }
        if self.inbound_queue_capacity == 0 || self.outbound_queue_capacity == 0 {
            return Err(BridgeError::InvalidConfig("queue capacities must be non-zero".into()));
        }
        if self.keepalive_interval_ms == 0 || self.idle_timeout_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "keep-alive and idle timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn reset_pause(&self) -> Duration {
        Duration::from_millis(self.reset_pause_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Bring a configured model name into `models/...` form.
///
/// Empty means the default; fully qualified `models/` and `projects/` names
/// pass through; bare `gemini...` names get the `models/` prefix.
pub fn normalize_model(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.is_empty() {
        return DEFAULT_MODEL.to_string();
    }
    if trimmed.starts_with("models/") || trimmed.starts_with("projects/") {
        return trimmed.to_string();
    }
    format!("models/{trimmed}")
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { fallback } else { trimmed }
}
