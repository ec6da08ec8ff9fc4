// ABOUTME: Configuration types and parsing for bgctl.yml.
// ABOUTME: Handles YAML parsing, config discovery and application lookup.

mod application;
mod deserialize;
mod healthcheck;
mod init;
mod naming;
mod provider;
mod routing;
mod service;
mod supervisor;

pub use application::ApplicationConfig;
pub use healthcheck::HealthConfig;
pub use init::init_config;
pub use naming::NamingConfig;
pub use provider::ProviderConfig;
pub use routing::RoutingConfig;
pub use service::{ServiceConfig, TaskTemplate};
pub use supervisor::SupervisorConfig;

use crate::error::{Error, Result};
use crate::types::AppName;
use deserialize::deserialize_applications;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "bgctl.yml";
pub const CONFIG_FILENAME_ALT: &str = "bgctl.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".bgctl/config.yml";

/// Overrides `state_dir` when set.
pub const STATE_DIR_ENV: &str = "BGCTL_STATE_DIR";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default = "default_load_balancer")]
    pub load_balancer: String,

    /// Listener port; the first listener is used when unset.
    #[serde(default)]
    pub listener_port: Option<u16>,

    /// Cluster name; the first listed cluster is used when unset.
    #[serde(default)]
    pub cluster: Option<String>,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Locks and promotion history live here.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(deserialize_with = "deserialize_applications")]
    pub applications: NonEmpty<ApplicationConfig>,
}

fn default_load_balancer() -> String {
    "blue-green-alb".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".bgctl/state")
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config
            .naming
            .validate()
            .map_err(Error::InvalidConfig)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Look up a configured application by name.
    pub fn application(&self, name: &AppName) -> Result<&ApplicationConfig> {
        self.applications
            .iter()
            .find(|a| &a.name == name)
            .ok_or_else(|| Error::UnknownApplication(name.to_string()))
    }

    /// State directory resolved against `base`, honouring `BGCTL_STATE_DIR`.
    pub fn state_dir(&self, base: &Path) -> PathBuf {
        match std::env::var_os(STATE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => base.join(dir),
            _ => base.join(&self.state_dir),
        }
    }
}
