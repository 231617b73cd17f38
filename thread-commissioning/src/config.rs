// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Commissioning configuration file
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! commissioner_id = "thread-commission"
//! domain_name = "Thread"
//! enable_ccm = false
//! joiner_timeout_secs = 200
//! resolve_timeout_secs = 5
//! resolution_queue_capacity = 32
//! database_path = "/home/me/.local/share/thread-commission/credentials.db"
//! mdns_service_type = "_meshcop._udp.local."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use thread_commissioner::{
    CommissionerConfig, DEFAULT_COMMISSIONER_ID, DEFAULT_DOMAIN_NAME, DEFAULT_JOINER_TIMEOUT,
};
use thread_common::Pskc;
use thread_discovery::{DiscoveryConfig, MESHCOP_SERVICE_TYPE};

/// Directory name under the platform config and data directories
pub const APP_DIR: &str = "thread-commission";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommissioningConfig {
    pub commissioner_id: String,
    pub domain_name: String,
    pub enable_ccm: bool,
    /// How long to wait for a joiner before giving up
    pub joiner_timeout_secs: u64,
    /// How long one mDNS resolve may take
    pub resolve_timeout_secs: u64,
    pub resolution_queue_capacity: usize,
    pub database_path: PathBuf,
    pub mdns_service_type: String,
}

impl Default for CommissioningConfig {
    fn default() -> Self {
        Self {
            commissioner_id: DEFAULT_COMMISSIONER_ID.to_string(),
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            enable_ccm: false,
            joiner_timeout_secs: DEFAULT_JOINER_TIMEOUT.as_secs(),
            resolve_timeout_secs: 5,
            resolution_queue_capacity: 32,
            database_path: default_database_path(),
            mdns_service_type: MESHCOP_SERVICE_TYPE.to_string(),
        }
    }
}

/// `<data dir>/thread-commission/credentials.db`, or the working directory
/// when the platform has no data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_default()
        .join("credentials.db")
}

/// `<config dir>/thread-commission/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

impl CommissioningConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read the config file at `path`
    ///
    /// # Errors
    ///
    /// Returns `Read` if the file cannot be read and `Parse` if it is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Read `path` if given, else the default config file if it exists, else
    /// use defaults
    ///
    /// # Errors
    ///
    /// An explicit `path` must be readable; the default file only has to be
    /// valid when present.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "Loading default config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn joiner_timeout(&self) -> Duration {
        Duration::from_secs(self.joiner_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            service_type: self.mdns_service_type.clone(),
            queue_capacity: self.resolution_queue_capacity,
        }
    }

    /// Native commissioner configuration for a network with this PSKc
    pub fn commissioner_config(&self, pskc: Pskc) -> CommissionerConfig {
        CommissionerConfig::new(pskc)
            .with_id(self.commissioner_id.clone())
            .with_domain_name(self.domain_name.clone())
            .with_ccm(self.enable_ccm)
    }
}
