//! Control API client
//!
//! Used by the command-line binary to talk to a running agent. Each call
//! opens a connection, sends one request line and reads one response line.

use crate::control::{ApiError, ApiRequest, ApiResponse, ControlAction};
use crate::vpn::{OperationOutput, VpnState};
use serde::Deserialize;
use std::path::PathBuf;

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(unix)]
use tokio::net::UnixStream;

/// Result of a remote vpnOn/vpnOff call
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleReport {
    /// Captured output of the external operation
    pub output: OperationOutput,
    /// State after the call
    pub state: VpnState,
}

#[derive(Debug, Deserialize)]
struct PathsData {
    paths: Vec<String>,
}

/// Client for the control socket
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket_path: PathBuf,
}

impl ControlClient {
    /// Create a client for the socket at `socket_path`
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// getVpnPaths
    pub async fn get_vpn_paths(&self) -> Result<Vec<String>, ApiError> {
        let data = self.call(ControlAction::GetVpnPaths, None).await?;
        let data: PathsData = decode(data)?;
        Ok(data.paths)
    }

    /// addVpnPath
    pub async fn add_vpn_path(&self, path: impl Into<String>) -> Result<(), ApiError> {
        self.call(ControlAction::AddVpnPath, Some(path.into())).await?;
        Ok(())
    }

    /// deleteVpnPaths
    pub async fn delete_vpn_paths(&self) -> Result<(), ApiError> {
        self.call(ControlAction::DeleteVpnPaths, None).await?;
        Ok(())
    }

    /// vpnOn
    pub async fn vpn_on(&self) -> Result<ToggleReport, ApiError> {
        decode(self.call(ControlAction::VpnOn, None).await?)
    }

    /// vpnOff
    pub async fn vpn_off(&self) -> Result<ToggleReport, ApiError> {
        decode(self.call(ControlAction::VpnOff, None).await?)
    }

    async fn call(
        &self,
        action: ControlAction,
        path: Option<String>,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let request = ApiRequest {
            id: format!("cli-{}", std::process::id()),
            action,
            path,
        };
        self.send(&request).await?.into_result()
    }

    /// Send one request and wait for its response
    #[cfg(unix)]
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ApiError::InternalError(format!(
                "Failed to connect to {:?}: {}",
                self.socket_path, e
            ))
        })?;
        let (reader, mut writer) = stream.into_split();

        let mut line = request.to_json()?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to send request: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to flush request: {}", e)))?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        let read = reader
            .read_line(&mut response)
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to read response: {}", e)))?;
        if read == 0 {
            return Err(ApiError::InternalError(
                "Agent closed the connection without responding".to_string(),
            ));
        }

        ApiResponse::from_json(response.trim_end())
    }

    /// Send one request (non-Unix)
    #[cfg(not(unix))]
    pub async fn send(&self, _request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        Err(ApiError::InternalError(
            "Control client requires Unix domain sockets".to_string(),
        ))
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    data: Option<serde_json::Value>,
) -> Result<T, ApiError> {
    let data = data.ok_or_else(|| {
        ApiError::SerializationError("Response carried no data".to_string())
    })?;
    serde_json::from_value(data).map_err(|e| ApiError::SerializationError(e.to_string()))
}
