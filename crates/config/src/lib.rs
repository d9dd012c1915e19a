//! Configuration loading, env substitution, and validation.
//!
//! Config files: `chatrelay.toml`, `chatrelay.yaml`, or `chatrelay.json`
//! Searched in `./` then `~/.config/chatrelay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{ChatbotConfig, ChatrelayConfig, WhatsAppConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
