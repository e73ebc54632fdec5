use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.mangadex.org";
pub const DEFAULT_AUTH_URL: &str = "https://auth.mangadex.org/realms/mangadex/protocol/openid-connect/token";
pub const DEFAULT_UPLOADS_URL: &str = "https://uploads.mangadex.org";

/// Client settings. Every field has a default; a TOML file may set any subset.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth_url: String,
    pub uploads_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Minimum spacing between two requests from one transport.
    pub rate_limit_ms: u64,
    pub slow_warn_ms: u64,
    /// Results per page when paginating (the API caps this at 100).
    pub page_size: usize,
    /// The API refuses offset + limit beyond this.
    pub max_results: usize,
    /// Results returned by searches that do not pass a limit.
    pub default_limit: usize,
    /// Applied as the global display locale when the client is built.
    pub locale: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            uploads_url: DEFAULT_UPLOADS_URL.to_string(),
            user_agent: format!("mangadex-client/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 30_000,
            rate_limit_ms: 200,
            slow_warn_ms: 5_000,
            page_size: 100,
            max_results: 10_000,
            default_limit: 10,
            locale: None,
        }
    }
}

impl ClientConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: ClientConfig = toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(cfg.with_env_overrides())
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self { Self::default().with_env_overrides() }

    /// `MANGADEX_API_URL`, `MANGADEX_AUTH_URL`, `MANGADEX_UPLOADS_URL`, `MANGADEX_TIMEOUT_MS`, `MANGADEX_LOCALE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MANGADEX_API_URL") { if !v.trim().is_empty() { self.api_url = v; } }
        if let Ok(v) = std::env::var("MANGADEX_AUTH_URL") { if !v.trim().is_empty() { self.auth_url = v; } }
        if let Ok(v) = std::env::var("MANGADEX_UPLOADS_URL") { if !v.trim().is_empty() { self.uploads_url = v; } }
        if let Some(ms) = std::env::var("MANGADEX_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()) { self.timeout_ms = ms; }
        if let Ok(v) = std::env::var("MANGADEX_LOCALE") { if !v.trim().is_empty() { self.locale = Some(v); } }
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url).map_err(|e| Error::Config(format!("api_url '{}': {e}", self.api_url)))?;
        url::Url::parse(&self.auth_url).map_err(|e| Error::Config(format!("auth_url '{}': {e}", self.auth_url)))?;
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}
