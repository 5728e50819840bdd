//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain serde data so it can be embedded in a caller's own
//! config file; `from_env` covers the common case of pointing a tool at a
//! bucketd through `BUCKETD_ENDPOINT` / `BUCKETD_TIMEOUT_MS`. Anything unset
//! or unparsable falls back to the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_ENDPOINT: &str = "BUCKETD_ENDPOINT";
pub const ENV_TIMEOUT_MS: &str = "BUCKETD_TIMEOUT_MS";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Applied to calls whose context carries no deadline of its own.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_user_agent() -> String {
    concat!("bucketclient-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: None,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Read `BUCKETD_ENDPOINT` and `BUCKETD_TIMEOUT_MS`, falling back to
    /// defaults for anything unset. An unparsable timeout is ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|e| !e.is_empty()) {
            config.endpoint = endpoint;
        }
        config.timeout_ms = lookup(ENV_TIMEOUT_MS).and_then(|t| t.trim().parse().ok());
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
