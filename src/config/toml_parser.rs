//! TOML configuration file parser
//!
//! All sections and keys are optional in the file; the conversion into
//! [`Config`] fills in the defaults.

use crate::config::{
    default_off_program, default_on_program, default_store_path, default_wg_quick_program,
    Config, ControlConfig, StoreBackendKind, StoreConfig, ToggleConfig, ToggleMode,
};
use crate::error::{Result, VpnPathsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// `[store]` section
    #[serde(default)]
    pub store: TomlStoreConfig,

    /// `[toggle]` section
    #[serde(default)]
    pub toggle: TomlToggleConfig,

    /// `[control]` section
    #[serde(default)]
    pub control: TomlControlConfig,
}

/// TOML store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlStoreConfig {
    /// Backend kind
    pub backend: Option<StoreBackendKind>,

    /// JSON file location
    pub path: Option<PathBuf>,
}

/// TOML toggle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlToggleConfig {
    /// Invocation mode
    pub mode: Option<ToggleMode>,

    /// Program for "on"
    pub on_program: Option<String>,

    /// Program for "off"
    pub off_program: Option<String>,

    /// wg-quick binary
    pub wg_quick_program: Option<String>,

    /// Run wg-quick through sudo
    pub use_sudo: Option<bool>,

    /// Timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// TOML control configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlControlConfig {
    /// Unix socket path
    pub socket_path: Option<PathBuf>,
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            VpnPathsError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| VpnPathsError::Config(format!("Failed to parse TOML config: {}", e)))
    }
}

// Convert TOML config to internal Config
impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Self {
        Config {
            store: toml.store.into(),
            toggle: toml.toggle.into(),
            control: toml.control.into(),
        }
    }
}

impl From<TomlStoreConfig> for StoreConfig {
    fn from(store: TomlStoreConfig) -> Self {
        StoreConfig {
            backend: store.backend.unwrap_or(StoreBackendKind::File),
            path: store.path.unwrap_or_else(default_store_path),
        }
    }
}

impl From<TomlToggleConfig> for ToggleConfig {
    fn from(toggle: TomlToggleConfig) -> Self {
        ToggleConfig {
            mode: toggle.mode.unwrap_or(ToggleMode::Command),
            on_program: toggle.on_program.unwrap_or_else(default_on_program),
            off_program: toggle.off_program.unwrap_or_else(default_off_program),
            wg_quick_program: toggle
                .wg_quick_program
                .unwrap_or_else(default_wg_quick_program),
            use_sudo: toggle.use_sudo.unwrap_or(false),
            timeout_secs: toggle.timeout_secs,
        }
    }
}

impl From<TomlControlConfig> for ControlConfig {
    fn from(control: TomlControlConfig) -> Self {
        match control.socket_path {
            Some(socket_path) => ControlConfig { socket_path },
            None => ControlConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [store]
            backend = "file"
            path = "/var/lib/vpn-paths-agent/paths.json"

            [toggle]
            mode = "command"
            on_program = "/usr/local/bin/vpn-on"
            off_program = "/usr/local/bin/vpn-off"
            timeout_secs = 90

            [control]
            socket_path = "/run/vpn-paths-agent.sock"
        "#;

        let parsed = TomlConfig::parse(toml).expect("Failed to parse TOML");
        assert_eq!(parsed.store.backend, Some(StoreBackendKind::File));
        assert_eq!(parsed.toggle.timeout_secs, Some(90));

        let config: Config = parsed.into();
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/vpn-paths-agent/paths.json")
        );
        assert_eq!(
            config.control.socket_path,
            PathBuf::from("/run/vpn-paths-agent.sock")
        );
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config: Config = TomlConfig::parse("").unwrap().into();
        assert_eq!(config.store.backend, StoreBackendKind::File);
        assert_eq!(config.toggle.mode, ToggleMode::Command);
        assert_eq!(config.toggle.wg_quick_program, "wg-quick");
        assert!(!config.toggle.use_sudo);
    }

    #[test]
    fn test_parse_wg_quick_mode() {
        let toml = r#"
            [toggle]
            mode = "wg_quick"
            use_sudo = true
        "#;

        let config: Config = TomlConfig::parse(toml).unwrap().into();
        assert_eq!(config.toggle.mode, ToggleMode::WgQuick);
        assert!(config.toggle.use_sudo);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = r#"
            [toggle]
            on_command = "/usr/local/bin/vpn-on"
        "#;
        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let toml = r#"
            [store]
            backend = "sqlite"
        "#;
        assert!(TomlConfig::parse(toml).is_err());
    }
}
