// Copyright (c) 2026 Skyglow
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Node configuration (TOML) with environment overrides.
//!
//! ```text
//! data_dir = "./data"          # empty => in-memory only
//! reveal_ttl_ms = 0            # 0 => pending reveals never expire
//! metrics_addr = "127.0.0.1:9464"
//!
//! [access]
//! policy = "contributor"       # or "open"
//! delegates = ["<64 hex>", ...]
//!
//! [oracle]
//! key_path = "./data/oracle.key"
//! public_key_hex = ""          # empty => derived from key_path
//! delay_ms = 250
//! ```
//!
//! Overrides: `SKYGLOW_DATA_DIR`, `SKYGLOW_METRICS_ADDR`, `SKYGLOW_REVEAL_TTL_MS`.

use crate::core::{
    access::{AccessPolicy, ContributorPolicy, OpenPolicy},
    types::ContributorId,
};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cannot read the config file.
    #[error("read config")]
    Read,
    /// Cannot parse TOML.
    #[error("parse config: {0}")]
    Parse(String),
    /// Unknown access policy name.
    #[error("unknown access policy {0:?}")]
    UnknownPolicy(String),
    /// Delegate id is not 64 hex characters.
    #[error("invalid delegate id {0:?}")]
    InvalidDelegate(String),
    /// Environment override does not parse.
    #[error("invalid value for {0}")]
    InvalidEnv(&'static str),
}

/// Reveal authorization settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// `"contributor"` or `"open"`.
    pub policy: String,
    /// Hex contributor ids allowed to reveal any observation.
    pub delegates: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            policy: "contributor".to_string(),
            delegates: Vec::new(),
        }
    }
}

/// Simulated oracle settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Oracle signing key file (created if missing).
    pub key_path: String,
    /// Pinned verifier key; derived from `key_path` when empty.
    pub public_key_hex: String,
    /// Simulated callback latency.
    pub delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            key_path: "./data/oracle.key".to_string(),
            public_key_hex: String::new(),
            delay_ms: 250,
        }
    }
}

/// Node configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Durable store directory; empty keeps the ledger in memory.
    pub data_dir: String,
    /// Pending reveal TTL in ms; 0 disables expiry.
    pub reveal_ttl_ms: u64,
    /// `host:port` for the metrics endpoint; empty disables it.
    pub metrics_addr: String,
    /// Authorization.
    pub access: AccessConfig,
    /// Oracle.
    pub oracle: OracleConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            reveal_ttl_ms: 0,
            metrics_addr: "127.0.0.1:9464".to_string(),
            access: AccessConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl LedgerConfig {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if given, else defaults; then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => {
                let text = fs::read_to_string(p).map_err(|_| ConfigError::Read)?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        if let Some(v) = env_nonempty("SKYGLOW_DATA_DIR") {
            cfg.data_dir = v;
        }
        if let Some(v) = env_nonempty("SKYGLOW_METRICS_ADDR") {
            cfg.metrics_addr = v;
        }
        if let Some(v) = env_nonempty("SKYGLOW_REVEAL_TTL_MS") {
            cfg.reveal_ttl_ms = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("SKYGLOW_REVEAL_TTL_MS"))?;
        }
        Ok(cfg)
    }

    /// Build the configured access policy.
    pub fn access_policy(&self) -> Result<AccessPolicy, ConfigError> {
        match self.access.policy.trim() {
            "contributor" => {
                let mut delegates = Vec::with_capacity(self.access.delegates.len());
                for d in &self.access.delegates {
                    let id = ContributorId::from_hex(d)
                        .ok_or_else(|| ConfigError::InvalidDelegate(d.clone()))?;
                    delegates.push(id);
                }
                Ok(AccessPolicy::Contributor(ContributorPolicy::with_delegates(
                    delegates,
                )))
            }
            "open" => Ok(AccessPolicy::Open(OpenPolicy)),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}
