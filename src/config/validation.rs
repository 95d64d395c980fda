//! Configuration validation functions

use crate::error::{Result, VpnPathsError};
use std::path::Path;

/// Validate an external program name or path
pub fn validate_program(program: &str) -> Result<()> {
    if program.trim().is_empty() {
        return Err(VpnPathsError::Config(
            "Program cannot be empty".to_string(),
        ));
    }

    if program.contains('\0') {
        return Err(VpnPathsError::Config(format!(
            "Program '{}' contains a null byte",
            program.escape_debug()
        )));
    }

    Ok(())
}

/// Validate the path store file location
pub fn validate_store_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(VpnPathsError::Config(
            "Store path cannot be empty".to_string(),
        ));
    }

    if path.file_name().is_none() {
        return Err(VpnPathsError::Config(format!(
            "Store path {:?} does not name a file",
            path
        )));
    }

    Ok(())
}

/// Validate the control socket location
pub fn validate_socket_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(VpnPathsError::Config(format!(
            "Socket path {:?} must be absolute",
            path
        )));
    }
    Ok(())
}

/// Validate the toggle timeout
pub fn validate_timeout(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(VpnPathsError::Config(
            "Toggle timeout must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
