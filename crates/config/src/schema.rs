//! Config schema types.

use serde::{Deserialize, Serialize};

/// Service host used when neither the config file nor the environment sets one.
pub const DEFAULT_SERVICE_HOST: &str = "http://127.0.0.1:8081";

fn default_platform() -> String {
    "WhatsApp".to_string()
}

fn default_error_message() -> String {
    "An error occurred, please try again later.".to_string()
}

fn default_sidecar_url() -> String {
    "ws://127.0.0.1:3100".to_string()
}

fn default_ack_timeout_secs() -> u64 {
    30
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_connect_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChatrelayConfig {
    pub chatbot: ChatbotConfig,
    pub whatsapp: WhatsAppConfig,
}

/// Settings for invoking the remote command service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChatbotConfig {
    /// Platform tag sent with every invocation.
    pub platform: String,
    /// Root URL of the command service, e.g. `http://127.0.0.1:8081`.
    pub service_host: Option<String>,
    /// Total time allowed for one invocation's HTTP exchange, body included.
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// Upper bound on replies being delivered at once. Unbounded when unset.
    pub max_concurrent_replies: Option<usize>,
    /// Shown for error replies that carry no text of their own.
    pub error_message: String,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            service_host: None,
            request_timeout_secs: None,
            connect_timeout_secs: None,
            max_concurrent_replies: None,
            error_message: default_error_message(),
        }
    }
}

impl ChatbotConfig {
    pub fn with_service_host(mut self, host: impl Into<String>) -> Self {
        self.service_host = Some(host.into());
        self
    }
}

/// WhatsApp Web sidecar connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// WebSocket URL of the sidecar bridging to WhatsApp Web.
    pub sidecar_url: String,
    /// How long to wait for the sidecar to acknowledge a send.
    pub ack_timeout_secs: u64,
    pub connect_attempts: u32,
    /// Initial delay between connection attempts; doubles each retry.
    pub connect_backoff_ms: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            sidecar_url: default_sidecar_url(),
            ack_timeout_secs: default_ack_timeout_secs(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff_ms(),
        }
    }
}
