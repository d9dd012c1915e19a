use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ChatrelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatrelay.toml",
    "chatrelay.yaml",
    "chatrelay.yml",
    "chatrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChatrelayConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./chatrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatrelay/chatrelay.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ChatrelayConfig::default()` if no file is found or it fails to parse.
pub fn discover_and_load() -> ChatrelayConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ChatrelayConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            ChatrelayConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}

/// Apply environment overrides on top of file values.
///
/// `SERVICE_HOSTNAME` sets the command service root, `CHATRELAY_PLATFORM`
/// the platform tag, `CHATRELAY_SIDECAR_URL` the WhatsApp sidecar URL.
/// Empty values are ignored.
pub fn apply_env_overrides(config: &mut ChatrelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("SERVICE_HOSTNAME") {
        config.chatbot.service_host = Some(host);
    }
    if let Some(platform) = var("CHATRELAY_PLATFORM") {
        config.chatbot.platform = platform;
    }
    if let Some(url) = var("CHATRELAY_SIDECAR_URL") {
        config.whatsapp.sidecar_url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<ChatrelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
