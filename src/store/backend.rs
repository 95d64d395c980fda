//! Persistence backends for the VPN path list

use crate::error::{Result, VpnPathsError};
use crate::store::VpnPath;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage for the ordered path list
///
/// Implementations are not required to be internally synchronised;
/// [`crate::store::PathStore`] serialises every call.
pub trait PathBackend: Send {
    /// Read the full list
    fn load(&self) -> Result<Vec<VpnPath>>;

    /// Replace the full list
    fn save(&mut self, paths: &[VpnPath]) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// On-disk layout of the path file
#[derive(Debug, Default, Serialize, Deserialize)]
struct PathFile {
    paths: Vec<VpnPath>,
}

/// JSON file backend
///
/// Writes go to a sibling temporary file which then replaces the list file,
/// so a crash mid-write never leaves a truncated list behind.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Open the backend, creating the parent directory and an empty list
    /// file if they do not exist yet
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    VpnPathsError::Storage(format!(
                        "Failed to create store directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let mut backend = Self { path };
        if !backend.path.exists() {
            info!("Initialising empty VPN path store at {:?}", backend.path);
            backend.save(&[])?;
        }

        Ok(backend)
    }

    /// Location of the JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PathBackend for FileBackend {
    fn load(&self) -> Result<Vec<VpnPath>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store file {:?} missing, treating as empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(VpnPathsError::Storage(format!(
                    "Failed to read {:?}: {}",
                    self.path, e
                )))
            }
        };

        let file: PathFile = serde_json::from_str(&contents).map_err(|e| {
            VpnPathsError::Storage(format!("Corrupt store file {:?}: {}", self.path, e))
        })?;

        Ok(file.paths)
    }

    fn save(&mut self, paths: &[VpnPath]) -> Result<()> {
        let file = PathFile {
            paths: paths.to_vec(),
        };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| VpnPathsError::Storage(format!("Failed to encode path list: {}", e)))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, contents).map_err(|e| {
            VpnPathsError::Storage(format!("Failed to write {:?}: {}", temp_path, e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            VpnPathsError::Storage(format!(
                "Failed to replace {:?} with {:?}: {}",
                self.path, temp_path, e
            ))
        })?;

        debug!("Saved {} VPN path(s) to {:?}", paths.len(), self.path);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory backend, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryBackend {
    paths: Vec<VpnPath>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<VpnPath>> {
        Ok(self.paths.clone())
    }

    fn save(&mut self, paths: &[VpnPath]) -> Result<()> {
        self.paths = paths.to_vec();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
