//! VPN path storage
//!
//! [`PathStore`] owns the ordered list of registered VPN paths. Insertion
//! order is preserved and duplicates are allowed. Every operation runs under
//! a single lock, so a `list()` issued after a completed `add()` or `clear()`
//! always observes the mutation.

mod backend;

pub use backend::{FileBackend, MemoryBackend, PathBackend};

use crate::config::{StoreBackendKind, StoreConfig};
use crate::error::{Result, VpnPathsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A filesystem path registered as part of the VPN configuration
///
/// The value is opaque; the only rule is that it is not empty or made up of
/// whitespace alone. It is stored exactly as given, without trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VpnPath(String);

impl VpnPath {
    /// Create a new VPN path, rejecting blank input
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(VpnPathsError::Validation(
                "VPN path cannot be empty".to_string(),
            ));
        }
        Ok(Self(path))
    }

    /// Borrow the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VpnPath {
    type Error = VpnPathsError;

    fn try_from(value: String) -> Result<Self> {
        VpnPath::new(value)
    }
}

impl From<VpnPath> for String {
    fn from(path: VpnPath) -> Self {
        path.0
    }
}

impl AsRef<str> for VpnPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VpnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, persisted set of VPN paths
///
/// Backend calls run on the blocking thread pool while the store lock is
/// held, so file I/O never stalls a runtime worker.
pub struct PathStore {
    backend: Arc<Mutex<Box<dyn PathBackend>>>,
}

impl PathStore {
    /// Create a store over the given backend
    pub fn new(backend: Box<dyn PathBackend>) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    /// Create a store that keeps paths in memory only
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Create a store from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend: Box<dyn PathBackend> = match config.backend {
            StoreBackendKind::File => Box::new(FileBackend::open(&config.path)?),
            StoreBackendKind::Memory => Box::new(MemoryBackend::new()),
        };
        info!("Using {} VPN path store", backend.name());
        Ok(Self::new(backend))
    }

    /// Return the current list, in insertion order
    pub async fn list(&self) -> Result<Vec<VpnPath>> {
        let paths = self.with_backend(|backend| backend.load()).await?;
        debug!("Listed {} VPN path(s)", paths.len());
        Ok(paths)
    }

    /// Append a path to the end of the list
    pub async fn add(&self, path: VpnPath) -> Result<()> {
        let added = path.clone();
        let total = self
            .with_backend(move |backend| {
                let mut paths = backend.load()?;
                paths.push(path);
                backend.save(&paths)?;
                Ok(paths.len())
            })
            .await?;
        info!("Added VPN path '{}' ({} total)", added, total);
        Ok(())
    }

    /// Remove every path
    pub async fn clear(&self) -> Result<()> {
        self.with_backend(|backend| backend.save(&[])).await?;
        info!("Cleared all VPN paths");
        Ok(())
    }

    async fn with_backend<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Box<dyn PathBackend>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut backend = self.backend.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || op(&mut *backend))
            .await
            .map_err(|e| VpnPathsError::Storage(format!("Store task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vpn_path_validation() {
        assert!(VpnPath::new("/etc/vpn/conf1").is_ok());
        assert!(VpnPath::new(" /etc/vpn/padded ").is_ok());

        assert!(matches!(VpnPath::new(""), Err(VpnPathsError::Validation(_))));
        assert!(matches!(VpnPath::new("   "), Err(VpnPathsError::Validation(_))));
        assert!(matches!(VpnPath::new("\t\n"), Err(VpnPathsError::Validation(_))));
    }

    #[test]
    fn test_vpn_path_kept_verbatim() {
        let path = VpnPath::new(" /etc/vpn/padded ").unwrap();
        assert_eq!(path.as_str(), " /etc/vpn/padded ");
        assert_eq!(path.to_string(), " /etc/vpn/padded ");
    }

    #[test]
    fn test_vpn_path_json() {
        let path = VpnPath::new("/etc/vpn/conf1").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""/etc/vpn/conf1""#);

        assert!(serde_json::from_str::<VpnPath>(r#""""#).is_err());
    }

    #[tokio::test]
    async fn test_add_list_clear() {
        let store = PathStore::in_memory();
        assert!(store.list().await.unwrap().is_empty());

        store.add(VpnPath::new("/etc/vpn/conf1").unwrap()).await.unwrap();
        store.add(VpnPath::new("/etc/vpn/conf2").unwrap()).await.unwrap();
        store.add(VpnPath::new("/etc/vpn/conf1").unwrap()).await.unwrap();

        let listed: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(listed, vec!["/etc/vpn/conf1", "/etc/vpn/conf2", "/etc/vpn/conf1"]);

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_empty_store() {
        let store = PathStore::in_memory();
        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_adds_to_file_store() {
        let tmp_dir = tempfile::TempDir::new().unwrap();
        let path = tmp_dir.path().join("vpn_paths.json");
        let store = Arc::new(PathStore::new(Box::new(FileBackend::open(&path).unwrap())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(VpnPath::new(format!("/etc/wireguard/wg{}.conf", i)).unwrap())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 8);
        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(PathStore::in_memory());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(VpnPath::new(format!("/etc/vpn/{}.conf", i)).unwrap())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 16);
    }
}
