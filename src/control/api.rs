//! Control API request and response types
//!
//! Requests and responses are single-line JSON objects. Action names are
//! the camelCase command names (`getVpnPaths`, `addVpnPath`, ...).

use serde::{Deserialize, Serialize};

/// Operations exposed by the command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlAction {
    /// List registered VPN paths
    GetVpnPaths,
    /// Register a VPN path
    AddVpnPath,
    /// Remove every registered VPN path
    DeleteVpnPaths,
    /// Turn the VPN on
    VpnOn,
    /// Turn the VPN off
    VpnOff,
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlAction::GetVpnPaths => "getVpnPaths",
            ControlAction::AddVpnPath => "addVpnPath",
            ControlAction::DeleteVpnPaths => "deleteVpnPaths",
            ControlAction::VpnOn => "vpnOn",
            ControlAction::VpnOff => "vpnOff",
        };
        f.write_str(name)
    }
}

/// API request from client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Request ID for tracking
    #[serde(default = "default_request_id")]
    pub id: String,

    /// Action to perform
    pub action: ControlAction,

    /// Path argument (addVpnPath only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiRequest {
    /// Create a new API request without arguments
    pub fn new(id: String, action: ControlAction) -> Self {
        Self {
            id,
            action,
            path: None,
        }
    }

    /// Create an addVpnPath request
    pub fn add_vpn_path(id: String, path: impl Into<String>) -> Self {
        Self {
            id,
            action: ControlAction::AddVpnPath,
            path: Some(path.into()),
        }
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::ParseError(e.to_string()))
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}

/// API response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Request ID this response corresponds to
    pub id: String,

    /// Whether the request was successful
    pub success: bool,

    /// Optional result data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Optional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Create a successful response
    pub fn success(id: String, data: Option<serde_json::Value>) -> Self {
        Self {
            id,
            success: true,
            data,
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: String, error: ApiError) -> Self {
        Self {
            id,
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Turn the response back into a result
    pub fn into_result(self) -> Result<Option<serde_json::Value>, ApiError> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data),
            (false, Some(error)) => Err(error),
            (false, None) => Err(ApiError::InternalError(
                "Request failed without an error".to_string(),
            )),
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::ParseError(e.to_string()))
    }
}

/// API error types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum ApiError {
    /// Failed to parse request
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize response
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Request argument is malformed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Path store unreadable or unwritable
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Another toggle is in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<crate::error::VpnPathsError> for ApiError {
    fn from(err: crate::error::VpnPathsError) -> Self {
        use crate::error::VpnPathsError;
        match err {
            VpnPathsError::Validation(msg) => ApiError::ValidationError(msg),
            VpnPathsError::Storage(msg) => ApiError::StorageError(msg),
            VpnPathsError::Busy(msg) => ApiError::Busy(msg),
            VpnPathsError::Config(msg) => ApiError::ConfigError(msg),
            VpnPathsError::Serialization(msg) => ApiError::SerializationError(msg),
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

fn default_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("req-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        let json = serde_json::to_string(&ControlAction::GetVpnPaths).unwrap();
        assert_eq!(json, r#""getVpnPaths""#);

        let action: ControlAction = serde_json::from_str(r#""deleteVpnPaths""#).unwrap();
        assert_eq!(action, ControlAction::DeleteVpnPaths);
        assert_eq!(ControlAction::VpnOff.to_string(), "vpnOff");
    }

    #[test]
    fn test_request_parsing() {
        let req = ApiRequest::from_json(
            r#"{"id":"r1","action":"addVpnPath","path":"/etc/vpn/conf1"}"#,
        )
        .unwrap();
        assert_eq!(req.id, "r1");
        assert_eq!(req.action, ControlAction::AddVpnPath);
        assert_eq!(req.path.as_deref(), Some("/etc/vpn/conf1"));

        let req = ApiRequest::from_json(r#"{"action":"vpnOn"}"#).unwrap();
        assert!(req.id.starts_with("req-"));
        assert!(req.path.is_none());
    }

    #[test]
    fn test_request_unknown_action() {
        let result = ApiRequest::from_json(r#"{"id":"r1","action":"rotateKeys"}"#);
        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }

    #[test]
    fn test_request_omits_missing_path() {
        let req = ApiRequest::new("r2".to_string(), ControlAction::VpnOff);
        let json = req.to_json().unwrap();
        assert!(!json.contains("path"));
    }

    #[test]
    fn test_error_wire_format() {
        let resp = ApiResponse::error("r3".to_string(), ApiError::Busy("toggle running".to_string()));
        let value: serde_json::Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["type"], "busy");
        assert_eq!(value["error"]["message"], "toggle running");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_into_result() {
        let ok = ApiResponse::success("r4".to_string(), Some(serde_json::json!({"paths": []})));
        assert!(ok.into_result().unwrap().is_some());

        let err = ApiResponse::error(
            "r5".to_string(),
            ApiError::ValidationError("VPN path cannot be empty".to_string()),
        );
        assert_eq!(
            err.into_result().unwrap_err(),
            ApiError::ValidationError("VPN path cannot be empty".to_string())
        );
    }

    #[test]
    fn test_api_error_conversion() {
        let err = crate::error::VpnPathsError::Storage("disk full".to_string());
        let api_error: ApiError = err.into();

        match api_error {
            ApiError::StorageError(msg) => assert_eq!(msg, "disk full"),
            _ => panic!("Wrong error type"),
        }
    }
}
