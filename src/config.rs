// Copyright 2025 dentsusoken
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

use crate::election::LeaderElectionSettings;
use crate::error::{LeaseError, Result};
use crate::lock::LockSettings;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "leasehold.toml";
pub const HOME_ENV: &str = "LEASEHOLD_HOME";
const ENV_PREFIX: &str = "LEASEHOLD";
const DEFAULT_HOME_DIR: &str = ".leasehold";
const DEFAULT_STORE_DIR: &str = "store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root of the file store; relative paths resolve against the home directory.
    pub path: Option<PathBuf>,
    pub auto_create_tables: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: None,
            auto_create_tables: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseholdConfig {
    pub store: StoreConfig,
    pub lock: LockSettings,
    pub leader_election: HashMap<String, LeaderElectionSettings>,

    #[serde(skip)]
    home: PathBuf,
}

impl LeaseholdConfig {
    /// Loads `<home>/leasehold.toml` (if present) overlaid with
    /// `LEASEHOLD_<SECTION>__<KEY>` environment variables.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            log::debug!("Config file not found at {config_path:?}, using defaults");
        }

        let settings = Config::builder()
            .add_source(File::from(config_path.as_path()).required(false))
            .add_source(Self::environment())
            .build()?;

        let mut config: LeaseholdConfig = settings.try_deserialize()?;
        config.home = home.to_path_buf();
        config.validate()?;

        log::debug!("Loaded config for home {home:?}");
        Ok(config)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(contents: &str, home: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?;

        let mut config: LeaseholdConfig = settings.try_deserialize()?;
        config.home = home.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    pub fn validate(&self) -> Result<()> {
        self.lock.validate()?;
        for (name, election) in &self.leader_election {
            election.validate(name)?;
        }
        if self.store.backend == StoreBackend::File
            && let Some(path) = &self.store.path
            && path.as_os_str().is_empty()
        {
            return Err(LeaseError::InvalidConfig(
                "store.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Root directory of the file store.
    pub fn store_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.home.join(path),
            None => self.home.join(DEFAULT_STORE_DIR),
        }
    }

    /// Settings of the named election; an unconfigured name gets the
    /// defaults. The group id falls back to the name.
    pub fn leader_election(&self, name: &str) -> LeaderElectionSettings {
        let mut settings = self
            .leader_election
            .get(name)
            .cloned()
            .unwrap_or_default();
        if settings.group_id.is_empty() {
            settings.group_id = name.to_string();
        }
        settings
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LeaseError::ConfigError(format!("Failed to serialize config: {e}")))
    }
}

/// `$LEASEHOLD_HOME`, or `~/.leasehold`.
pub fn leasehold_home() -> Result<PathBuf> {
    if let Ok(home) = env::var(HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .ok_or_else(|| LeaseError::ConfigError("Could not determine home directory".to_string()))
}
