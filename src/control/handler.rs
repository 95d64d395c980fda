//! Command surface
//!
//! [`CommandHandler`] is the boundary every caller goes through. It exposes
//! exactly five operations, each forwarding to the path store or the VPN
//! controller. Callers re-fetch the path list after a mutation; nothing is
//! pushed to them.

use crate::config::Config;
use crate::control::{ApiError, ApiRequest, ApiResponse, ControlAction};
use crate::error::{Result, VpnPathsError};
use crate::store::{PathStore, VpnPath};
use crate::vpn::{runner_from_config, Direction, OperationOutput, VpnController, VpnState};
use tracing::{debug, error, info};

/// Command handler owning the path store and the VPN controller
pub struct CommandHandler {
    store: PathStore,
    controller: VpnController,
}

impl CommandHandler {
    /// Create a handler from its two components
    pub fn new(store: PathStore, controller: VpnController) -> Self {
        Self { store, controller }
    }

    /// Build the store and the controller described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = PathStore::from_config(&config.store)?;
        let controller = VpnController::new(runner_from_config(&config.toggle));
        Ok(Self::new(store, controller))
    }

    /// getVpnPaths
    pub async fn get_vpn_paths(&self) -> Result<Vec<VpnPath>> {
        self.store.list().await
    }

    /// addVpnPath
    pub async fn add_vpn_path(&self, path: impl Into<String>) -> Result<()> {
        let path = VpnPath::new(path)?;
        self.store.add(path).await
    }

    /// deleteVpnPaths
    pub async fn delete_vpn_paths(&self) -> Result<()> {
        self.store.clear().await
    }

    /// vpnOn
    pub async fn vpn_on(&self) -> Result<OperationOutput> {
        let (output, _) = self.toggle(Direction::On).await?;
        Ok(output)
    }

    /// vpnOff
    pub async fn vpn_off(&self) -> Result<OperationOutput> {
        let (output, _) = self.toggle(Direction::Off).await?;
        Ok(output)
    }

    /// Run a toggle and return its output with the state it left behind
    pub async fn toggle(&self, direction: Direction) -> Result<(OperationOutput, VpnState)> {
        let paths = self.toggle_paths().await?;
        self.controller.toggle(direction, paths).await
    }

    /// Current VPN state
    pub async fn vpn_state(&self) -> VpnState {
        self.controller.state().await
    }

    async fn toggle_paths(&self) -> Result<Vec<VpnPath>> {
        if self.controller.uses_paths() {
            self.store.list().await
        } else {
            Ok(Vec::new())
        }
    }

    /// Handle an API request
    pub async fn handle_request(&self, request: ApiRequest) -> ApiResponse {
        debug!("Handling request {}: {}", request.id, request.action);

        let result = match request.action {
            ControlAction::GetVpnPaths => self.handle_get_vpn_paths().await,
            ControlAction::AddVpnPath => self.handle_add_vpn_path(&request).await,
            ControlAction::DeleteVpnPaths => self.handle_delete_vpn_paths().await,
            ControlAction::VpnOn => self.handle_toggle(Direction::On).await,
            ControlAction::VpnOff => self.handle_toggle(Direction::Off).await,
        };

        match result {
            Ok(data) => {
                info!("Request {} completed: {}", request.id, request.action);
                ApiResponse::success(request.id, data)
            }
            Err(e) => {
                error!("Request {} failed: {}", request.id, e);
                ApiResponse::error(request.id, e)
            }
        }
    }

    async fn handle_get_vpn_paths(&self) -> std::result::Result<Option<serde_json::Value>, ApiError> {
        let paths = self.get_vpn_paths().await?;
        Ok(Some(serde_json::json!({ "paths": paths })))
    }

    async fn handle_add_vpn_path(
        &self,
        request: &ApiRequest,
    ) -> std::result::Result<Option<serde_json::Value>, ApiError> {
        let path = request.path.clone().ok_or_else(|| {
            ApiError::from(VpnPathsError::Validation(
                "addVpnPath requires a path".to_string(),
            ))
        })?;
        self.add_vpn_path(path).await?;
        Ok(None)
    }

    async fn handle_delete_vpn_paths(&self) -> std::result::Result<Option<serde_json::Value>, ApiError> {
        self.delete_vpn_paths().await?;
        Ok(None)
    }

    async fn handle_toggle(
        &self,
        direction: Direction,
    ) -> std::result::Result<Option<serde_json::Value>, ApiError> {
        let (output, state) = self.toggle(direction).await?;
        Ok(Some(serde_json::json!({
            "output": output,
            "state": state,
        })))
    }
}
