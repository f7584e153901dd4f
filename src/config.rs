// Copyright (c) 2026 Blocker
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
#![warn(missing_docs)]

//! Node configuration (TOML). Every section and field has a default.
//!
//! ```text
//! [node]
//! name = "node-1"
//! data_dir = "./data"
//!
//! [p2p]
//! listen_addr = "127.0.0.1:3000"
//! bootstrap = ["127.0.0.1:3001"]
//!
//! [validator]
//! enabled = true
//! block_time_ms = 5000
//!
//! [storage]
//! backend = "sled"
//! ```

use crate::networking::node::{NodeOptions, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("read config: {0}")]
    Read(#[from] std::io::Error),
    /// Config file is not valid TOML for this schema.
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Node configuration root.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node settings.
    pub node: NodeSettings,
    /// Peer protocol settings.
    pub p2p: P2pConfig,
    /// Block proposal settings.
    pub validator: ValidatorConfig,
    /// Store backend.
    pub storage: StorageConfig,
    /// Status/metrics endpoint.
    pub http: HttpConfig,
    /// Logging.
    pub log: LogConfig,
}

/// Node settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Human-readable name.
    pub name: String,
    /// Data directory (db + keys).
    pub data_dir: String,
    /// Protocol identifier sent in handshakes.
    pub protocol_version: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: "blocker".into(),
            data_dir: "./data".into(),
            protocol_version: PROTOCOL_VERSION.into(),
        }
    }
}

/// Peer protocol settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    /// `host:port` to accept peer calls on; also advertised to peers.
    pub listen_addr: String,
    /// Peers to handshake at startup.
    pub bootstrap: Vec<String>,
    /// Bound on every outbound call, in milliseconds.
    pub peer_timeout_ms: u64,
    /// Largest accepted frame.
    pub max_frame_bytes: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".into(),
            bootstrap: Vec::new(),
            peer_timeout_ms: 2000,
            max_frame_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Block proposal settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Propose blocks.
    pub enabled: bool,
    /// Proposal period in milliseconds.
    pub block_time_ms: u64,
    /// Propose even when the mempool is empty.
    pub allow_empty_blocks: bool,
    /// Seed file; defaults to `<data_dir>/validator.seed`.
    pub key_file: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            block_time_ms: 5000,
            allow_empty_blocks: false,
            key_file: None,
        }
    }
}

/// Store backend selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost on exit.
    #[default]
    Memory,
    /// sled database directory.
    Sled,
}

/// Store settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend.
    pub backend: StorageBackend,
    /// Database directory; defaults to `<data_dir>/db`.
    pub path: Option<String>,
}

/// Status/metrics endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address, e.g. 0.0.0.0:9090. Disabled when unset.
    pub listen_addr: Option<String>,
}

/// Logging.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (`trace`..`error`).
    pub level: String,
    /// JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl NodeConfig {
    /// Parse TOML text and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: NodeConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.p2p.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("p2p.listen_addr is empty".into()));
        }
        if self.p2p.peer_timeout_ms == 0 {
            return Err(ConfigError::Invalid("p2p.peer_timeout_ms must be > 0".into()));
        }
        if self.p2p.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("p2p.max_frame_bytes must be > 0".into()));
        }
        if self.validator.block_time_ms == 0 {
            return Err(ConfigError::Invalid(
                "validator.block_time_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Validator seed file path.
    pub fn key_file(&self) -> PathBuf {
        match &self.validator.key_file {
            Some(p) => PathBuf::from(p),
            None => Path::new(&self.node.data_dir).join("validator.seed"),
        }
    }

    /// sled directory path.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(p) => PathBuf::from(p),
            None => Path::new(&self.node.data_dir).join("db"),
        }
    }

    /// Node tunables derived from this config.
    pub fn node_options(&self) -> NodeOptions {
        NodeOptions {
            listen_addr: self.p2p.listen_addr.clone(),
            protocol_version: self.node.protocol_version.clone(),
            peer_timeout: Duration::from_millis(self.p2p.peer_timeout_ms),
            block_time: Duration::from_millis(self.validator.block_time_ms),
            allow_empty_blocks: self.validator.allow_empty_blocks,
        }
    }
}
