// src/config.rs
//! Process configuration: upstream URLs, registered categories, timeouts.
//!
//! Resolution order:
//! 1) `$NEWS_CONFIG_PATH` (must exist if set) or `config/news.toml` if present
//! 2) environment overrides (`SKY_URL`, `BBC_URL`, `NEWS_CATEGORIES`, ...)
//!
//! Both upstream URLs are mandatory after resolution.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::news::{Category, CATEGORY_TECHNOLOGY, CATEGORY_UK};

pub const DEFAULT_CONFIG_PATH: &str = "config/news.toml";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 1_000;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const ENV_SKY_URL: &str = "SKY_URL";
pub const ENV_BBC_URL: &str = "BBC_URL";
pub const ENV_CATEGORIES: &str = "NEWS_CATEGORIES";
pub const ENV_HTTP_TIMEOUT_MS: &str = "NEWS_HTTP_TIMEOUT_MS";
pub const ENV_FETCH_TIMEOUT_MS: &str = "NEWS_FETCH_TIMEOUT_MS";

fn default_categories() -> Vec<String> {
    vec![CATEGORY_UK.to_string(), CATEGORY_TECHNOLOGY.to_string()]
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sky_url: String,
    #[serde(default)]
    pub bbc_url: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Whole-request timeout of the shared upstream HTTP client.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    /// Optional per-fetch deadline enforced by the service itself.
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sky_url: String::new(),
            bbc_url: String::new(),
            categories: default_categories(),
            http_timeout_ms: default_http_timeout_ms(),
            fetch_timeout_ms: None,
            version: default_version(),
        }
    }
}

impl AppConfig {
    /// File (if any) + env overrides, then validation.
    pub fn load() -> Result<Self> {
        let mut cfg = match config_path()? {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading news config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing news config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.categories = clean_list(cfg.categories);
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_non_empty(ENV_SKY_URL) {
            self.sky_url = v;
        }
        if let Some(v) = env_non_empty(ENV_BBC_URL) {
            self.bbc_url = v;
        }
        if let Some(v) = env_non_empty(ENV_CATEGORIES) {
            self.categories = clean_list(v.split(',').map(str::to_string).collect());
        }
        if let Some(v) = env_non_empty(ENV_HTTP_TIMEOUT_MS) {
            self.http_timeout_ms = v
                .parse()
                .with_context(|| format!("{ENV_HTTP_TIMEOUT_MS} must be an integer"))?;
        }
        if let Some(v) = env_non_empty(ENV_FETCH_TIMEOUT_MS) {
            let ms = v
                .parse()
                .with_context(|| format!("{ENV_FETCH_TIMEOUT_MS} must be an integer"))?;
            self.fetch_timeout_ms = Some(ms);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.sky_url.trim().is_empty() {
            bail!("missing env variable: {ENV_SKY_URL}");
        }
        if self.bbc_url.trim().is_empty() {
            bail!("missing env variable: {ENV_BBC_URL}");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.iter().map(|c| Category::new(c.as_str())).collect()
    }
}

fn config_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop blanks, keep first occurrence order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
