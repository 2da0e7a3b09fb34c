//! Feed client configuration

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FeedClientError, Result};

/// Configuration of one [`EventSourceClient`](crate::EventSourceClient)
///
/// Can be loaded from TOML or YAML, or built programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSourceConfig {
    /// Streaming endpoint URL
    pub url: String,

    /// Maximum silence between two reads before the stream is dropped
    /// (default: 5 minutes)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// TCP/TLS connect timeout (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Sent as `Authorization: Bearer <token>` when set
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_read_timeout() -> u64 {
    300_000
}

fn default_connect_timeout() -> u64 {
    10_000
}

impl EventSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            read_timeout_ms: default_read_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            bearer_token: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FeedClientError::Config(e.to_string()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| FeedClientError::Config(e.to_string()))
    }

    /// Load from a file, choosing YAML for `.yaml`/`.yml` and TOML otherwise
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_toml(&content),
        }
    }
}
