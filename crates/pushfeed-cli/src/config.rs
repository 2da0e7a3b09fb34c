//! Configuration file handling for pushfeed

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pushfeed_client::EventSourceConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default feed URL
    pub url: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Idle read timeout in milliseconds
    pub read_timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Bearer token for the feed
    pub token: Option<String>,
    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Connection-related command line values, before merging
#[derive(Debug, Clone, Default)]
pub struct ConnectArgs {
    pub url: Option<String>,
    pub read_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub token: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("pushfeed");

        Ok(config_dir.join("config.toml"))
    }

    /// Whether colors are disabled by either source
    pub fn no_color(&self, flag: bool) -> bool {
        flag || self.no_color.unwrap_or(false)
    }

    /// Merge CLI arguments over config file values into a client config
    pub fn feed_config(&self, args: ConnectArgs) -> Result<EventSourceConfig> {
        let url = args
            .url
            .or_else(|| self.url.clone())
            .context("No feed URL given (use --url, PUSHFEED_URL or the config file)")?;

        let mut config = EventSourceConfig::new(url);
        if let Some(ms) = args.read_timeout_ms.or(self.read_timeout_ms) {
            config = config.read_timeout_ms(ms);
        }
        if let Some(ms) = args.connect_timeout_ms.or(self.connect_timeout_ms) {
            config = config.connect_timeout_ms(ms);
        }
        if let Some(token) = args.token.or_else(|| self.token.clone()) {
            config = config.bearer_token(token);
        }
        for (name, value) in self.headers.iter() {
            config = config.header(name, value);
        }
        for (name, value) in args.headers {
            config = config.header(name, value);
        }

        Ok(config)
    }
}

/// Parse a `Name: value` header argument
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
