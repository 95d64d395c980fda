//! Configuration management
//!
//! This module handles parsing and validation of the agent configuration
//! from a static TOML file. Every section is optional; missing values fall
//! back to the defaults below.

mod toml_parser;
mod validation;

pub use toml_parser::TomlConfig;
pub use validation::{validate_program, validate_socket_path, validate_store_path, validate_timeout};

use crate::error::{Result, VpnPathsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/vpn-paths-agent/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the VPN path list lives
    pub store: StoreConfig,

    /// How the VPN is turned on and off
    pub toggle: ToggleConfig,

    /// Control socket settings
    pub control: ControlConfig,
}

/// Which persistence backend holds the path list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    /// JSON file on disk, survives restarts
    File,
    /// Process memory only
    Memory,
}

/// Path store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: StoreBackendKind,

    /// Location of the JSON file (file backend only)
    pub path: PathBuf,
}

/// How the external toggle operation is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleMode {
    /// Run `on_program` / `off_program` with no arguments
    Command,
    /// Run `wg-quick up|down <path>` for every registered path
    WgQuick,
}

/// Toggle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleConfig {
    /// Invocation mode
    pub mode: ToggleMode,

    /// Program run to turn the VPN on (command mode)
    pub on_program: String,

    /// Program run to turn the VPN off (command mode)
    pub off_program: String,

    /// wg-quick binary (wg_quick mode)
    pub wg_quick_program: String,

    /// Prefix wg-quick invocations with sudo
    pub use_sudo: bool,

    /// Kill the external program after this many seconds
    pub timeout_secs: Option<u64>,
}

/// Control socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Unix socket path
    pub socket_path: PathBuf,
}

impl Config {
    /// Create a configuration populated with defaults
    pub fn new() -> Self {
        Self {
            store: StoreConfig::default(),
            toggle: ToggleConfig::default(),
            control: ControlConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_config = TomlConfig::from_file(path)?;
        let config: Config = toml_config.into();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        let config: Config = TomlConfig::parse(toml)?.into();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or use defaults if the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config file at {:?}, using defaults", path);
            Ok(Self::new())
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackendKind::File {
            validate_store_path(&self.store.path)?;
        }

        match self.toggle.mode {
            ToggleMode::Command => {
                validate_program(&self.toggle.on_program)
                    .map_err(|e| VpnPathsError::Config(format!("toggle.on_program: {}", e)))?;
                validate_program(&self.toggle.off_program)
                    .map_err(|e| VpnPathsError::Config(format!("toggle.off_program: {}", e)))?;
            }
            ToggleMode::WgQuick => {
                validate_program(&self.toggle.wg_quick_program).map_err(|e| {
                    VpnPathsError::Config(format!("toggle.wg_quick_program: {}", e))
                })?;
            }
        }

        if let Some(secs) = self.toggle.timeout_secs {
            validate_timeout(secs)?;
        }

        validate_socket_path(&self.control.socket_path)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::File,
            path: default_store_path(),
        }
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            mode: ToggleMode::Command,
            on_program: default_on_program(),
            off_program: default_off_program(),
            wg_quick_program: default_wg_quick_program(),
            use_sudo: false,
            timeout_secs: None,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(crate::control::DEFAULT_SOCKET_PATH),
        }
    }
}

// Default value functions
pub(crate) fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join(crate::APP_NAME)
        .join("vpn_paths.json")
}

pub(crate) fn default_on_program() -> String {
    "/usr/local/bin/vpn-on".to_string()
}

pub(crate) fn default_off_program() -> String {
    "/usr/local/bin/vpn-off".to_string()
}

pub(crate) fn default_wg_quick_program() -> String {
    "wg-quick".to_string()
}
