//! Semantic checks on a loaded configuration.

use crate::schema::ChatrelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "chatbot.service_host"
    pub path: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    url.split_once("://")
        .is_some_and(|(scheme, rest)| schemes.contains(&scheme) && !rest.is_empty())
}

/// Validate a configuration, collecting every problem instead of stopping at the first.
pub fn validate(config: &ChatrelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let chatbot = &config.chatbot;

    match chatbot.service_host.as_deref().map(str::trim) {
        None | Some("") => result.push(
            Severity::Error,
            "chatbot.service_host",
            "service host is not set (config or SERVICE_HOSTNAME)",
        ),
        Some(host) if !has_scheme(host, &["http", "https"]) => result.push(
            Severity::Error,
            "chatbot.service_host",
            format!("expected an http(s) URL, got {host:?}"),
        ),
        Some(_) => {},
    }

    if chatbot.platform.trim().is_empty() {
        result.push(Severity::Warning, "chatbot.platform", "platform tag is empty");
    }
    if chatbot.max_concurrent_replies == Some(0) {
        result.push(
            Severity::Error,
            "chatbot.max_concurrent_replies",
            "must be at least 1; omit it for no limit",
        );
    }
    if chatbot.request_timeout_secs == Some(0) {
        result.push(
            Severity::Warning,
            "chatbot.request_timeout_secs",
            "a zero timeout fails every invocation",
        );
    }

    let whatsapp = &config.whatsapp;
    if !has_scheme(&whatsapp.sidecar_url, &["ws", "wss"]) {
        result.push(
            Severity::Error,
            "whatsapp.sidecar_url",
            format!("expected a ws(s) URL, got {:?}", whatsapp.sidecar_url),
        );
    }
    if whatsapp.ack_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "whatsapp.ack_timeout_secs",
            "must be at least 1 second",
        );
    }
    if whatsapp.connect_attempts == 0 {
        result.push(
            Severity::Warning,
            "whatsapp.connect_attempts",
            "0 attempts is treated as a single attempt",
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ChatrelayConfig {
        let mut cfg = ChatrelayConfig::default();
        cfg.chatbot.service_host = Some("http://127.0.0.1:8081".into());
        cfg
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        assert!(validate(&valid()).diagnostics.is_empty());
    }

    #[test]
    fn missing_service_host_is_error() {
        let result = validate(&ChatrelayConfig::default());
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "chatbot.service_host");
    }

    #[test]
    fn blank_service_host_is_error() {
        let mut cfg = valid();
        cfg.chatbot.service_host = Some("  ".into());
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn non_http_service_host_is_error() {
        let mut cfg = valid();
        cfg.chatbot.service_host = Some("ftp://svc".into());
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn zero_concurrency_is_error() {
        let mut cfg = valid();
        cfg.chatbot.max_concurrent_replies = Some(0);
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 1);
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut cfg = valid();
        cfg.chatbot.platform = String::new();
        cfg.whatsapp.connect_attempts = 0;
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 2);
    }

    #[test]
    fn http_sidecar_url_is_error() {
        let mut cfg = valid();
        cfg.whatsapp.sidecar_url = "http://127.0.0.1:3100".into();
        assert!(validate(&cfg).has_errors());
    }
}
