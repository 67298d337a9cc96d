//! Configuration from defaults, an optional YAML file, and environment variables.
//!
//! ```yaml
//! port: 6600
//! upstream_base_url: "https://api.anthropic.com"
//! models:
//!   - claude-3-haiku-20240307
//!   - claude-3-5-sonnet-20240620
//! log_file: /usr/local/var/log/claude2openai.log
//! ```
//!
//! The first entry of `models` is the default model.
//!
//! **Environment variables** (override the file):
//! - `HOST`: bind address (default: 0.0.0.0)
//! - `PORT`: server port (default: 6600)
//! - `CLAUDE2OPENAI_UPSTREAM_URL`: Claude API base URL (default: https://api.anthropic.com)
//! - `REQUEST_TIMEOUT_SECS`: upstream request timeout (default: 600)
//! - `CLAUDE2OPENAI_LOG_FILE`: append logs to this file instead of stderr

use crate::models::{ModelCatalog, DEFAULT_MODELS};
use crate::translation::DEFAULT_MAX_TOKENS;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 6600;
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub upstream_base_url: String,
    pub anthropic_version: String,
    pub request_timeout_secs: u64,
    pub default_max_tokens: u32,
    pub models: Vec<String>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    upstream_base_url: Option<String>,
    anthropic_version: Option<String>,
    request_timeout_secs: Option<u64>,
    default_max_tokens: Option<u32>,
    models: Option<Vec<String>>,
    log_file: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upstream_base_url: DEFAULT_UPSTREAM_URL.to_string(),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            request_timeout_secs: 600,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            log_file: None,
        }
    }
}

impl ProxyConfig {
    /// Defaults, then `path` (or the per-user config file when it exists), then
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(p) => Self::from_yaml_file(p)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: FileConfig = serde_yaml_ng::from_str(content)?;
        let defaults = Self::default();

        Ok(Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            upstream_base_url: file.upstream_base_url.unwrap_or(defaults.upstream_base_url),
            anthropic_version: file.anthropic_version.unwrap_or(defaults.anthropic_version),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            default_max_tokens: file.default_max_tokens.unwrap_or(defaults.default_max_tokens),
            models: file.models.unwrap_or(defaults.models),
            log_file: file.log_file.or(defaults.log_file),
        })
    }

    /// Apply environment overrides. Unparseable numbers are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(url) = lookup("CLAUDE2OPENAI_UPSTREAM_URL").filter(|u| !u.is_empty()) {
            self.upstream_base_url = url;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(path) = lookup("CLAUDE2OPENAI_LOG_FILE").filter(|p| !p.is_empty()) {
            self.log_file = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            bail!("`models` must list at least one Claude model");
        }
        if self.default_max_tokens == 0 {
            bail!("`default_max_tokens` must be greater than zero");
        }
        Ok(())
    }

    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog::new(self.models.clone()).unwrap_or_default()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `<config dir>/claude2openai/config.yml`, e.g. `~/.config/claude2openai/config.yml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("claude2openai").join("config.yml"))
}
