//! TOML configuration.
//!
//! Secrets (content-store token, search-index admin key, webhook secret)
//! are never stored in the file; each section names the environment
//! variable to read them from.

use anyhow::{bail, Context, Result};
use index_sync_core::normalize::NormalizeLimits;
use serde::Deserialize;
use std::path::Path;

use crate::logging::LoggingConfig;
use crate::server::HEALTH_PATH;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub content_store: ContentStoreConfig,
    pub search_index: SearchIndexConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub normalize: NormalizeLimits,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_webhook_path() -> String {
    "/api/algolia".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentStoreConfig {
    pub project_id: String,
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub use_cdn: bool,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Overrides `https://{project_id}.api.sanity.io`.
    #[serde(default)]
    pub api_host: Option<String>,
}

fn default_api_version() -> String {
    "2021-03-25".to_string()
}
fn default_document_type() -> String {
    "post".to_string()
}
fn default_token_env() -> String {
    "SANITY_API_TOKEN".to_string()
}

impl ContentStoreConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchIndexConfig {
    pub app_id: String,
    pub index_name: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Overrides `https://{app_id}.algolia.net`.
    #[serde(default)]
    pub host: Option<String>,
}

fn default_api_key_env() -> String {
    "ALGOLIA_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    1000
}

impl SearchIndexConfig {
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} not set", self.api_key_env))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
        }
    }
}

fn default_secret_env() -> String {
    "SANITY_WEBHOOK_SECRET".to_string()
}

impl WebhookConfig {
    /// The signing secret, or `None` when signature verification is off.
    pub fn secret(&self) -> Option<String> {
        std::env::var(&self.secret_env).ok().filter(|s| !s.is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if !config.server.webhook_path.starts_with('/') {
        bail!("server.webhook_path must start with '/'");
    }
    if config.server.webhook_path == HEALTH_PATH {
        bail!("server.webhook_path must not be {}", HEALTH_PATH);
    }

    if config.content_store.project_id.trim().is_empty() {
        bail!("content_store.project_id must not be empty");
    }
    if config.content_store.dataset.trim().is_empty() {
        bail!("content_store.dataset must not be empty");
    }

    if config.search_index.app_id.trim().is_empty() {
        bail!("search_index.app_id must not be empty");
    }
    if config.search_index.index_name.trim().is_empty() {
        bail!("search_index.index_name must not be empty");
    }
    if config.search_index.batch_size == 0 {
        bail!("search_index.batch_size must be > 0");
    }

    let limits = &config.normalize;
    if limits.title_max_chars == 0 {
        bail!("normalize.title_max_chars must be > 0");
    }
    if limits.body_chunk_chars == 0 {
        bail!("normalize.body_chunk_chars must be > 0");
    }
    if limits.max_record_bytes == 0 {
        bail!("normalize.max_record_bytes must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::io::Write;

    const MINIMAL: &str = r#"
[content_store]
project_id = "abc123"
dataset = "production"

[search_index]
app_id = "APPID"
index_name = "my-index"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        validate(&config).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.server.webhook_path, "/api/algolia");
        assert_eq!(config.content_store.api_version, "2021-03-25");
        assert_eq!(config.content_store.document_type, "post");
        assert!(!config.content_store.use_cdn);
        assert_eq!(config.search_index.batch_size, 1000);
        assert_eq!(config.search_index.api_key_env, "ALGOLIA_API_KEY");
        assert_eq!(config.webhook.secret_env, "SANITY_WEBHOOK_SECRET");
        assert_eq!(config.normalize, NormalizeLimits::default());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[server]
bind = "0.0.0.0:8080"
webhook_path = "/hooks/sanity"

[content_store]
project_id = "abc123"
dataset = "staging"
use_cdn = true
document_type = "article"
api_host = "http://127.0.0.1:9000"

[search_index]
app_id = "APPID"
index_name = "articles"
batch_size = 50
host = "http://127.0.0.1:9001"

[webhook]
secret_env = "MY_SECRET"

[normalize]
title_max_chars = 80

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(content).unwrap();
        validate(&config).unwrap();

        assert_eq!(config.server.webhook_path, "/hooks/sanity");
        assert!(config.content_store.use_cdn);
        assert_eq!(
            config.content_store.api_host.as_deref(),
            Some("http://127.0.0.1:9000")
        );
        assert_eq!(config.search_index.batch_size, 50);
        assert_eq!(config.webhook.secret_env, "MY_SECRET");
        assert_eq!(config.normalize.title_max_chars, 80);
        assert_eq!(config.normalize.body_chunk_chars, 9000);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let content = MINIMAL.replace(
            "index_name = \"my-index\"",
            "index_name = \"my-index\"\nbatch_size = 0",
        );
        let config: Config = toml::from_str(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_rejects_empty_project() {
        let content = MINIMAL.replace("abc123", " ");
        let config: Config = toml::from_str(&content).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_relative_webhook_path() {
        let content = format!("[server]\nwebhook_path = \"api\"\n{}", MINIMAL);
        let config: Config = toml::from_str(&content).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_webhook_path_on_health_route() {
        let content = format!("[server]\nwebhook_path = \"/health\"\n{}", MINIMAL);
        let config: Config = toml::from_str(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("/health"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.search_index.index_name, "my-index");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/isync.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
