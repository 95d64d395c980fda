//! vpn-paths-agent: keep a list of VPN paths and toggle the VPN on and off
//!
//! # Architecture
//!
//! The agent owns two pieces of state: the ordered list of registered VPN
//! paths and whether the VPN is currently on. Callers reach both through a
//! fixed set of five commands, either in-process or over a Unix socket.
//! Turning the VPN on or off runs an external program and hands its output
//! back to the caller verbatim.
//!
//! # Modules
//!
//! - `config`: Configuration parsing and validation
//! - `store`: The persisted VPN path list
//! - `vpn`: The on/off state machine and external toggle programs
//! - `control`: Command surface, socket server and client
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod control;
pub mod error;
pub mod store;
pub mod vpn;

// Re-export commonly used types
pub use control::CommandHandler;
pub use error::{Result, VpnPathsError};
pub use store::{PathStore, VpnPath};
pub use vpn::{OperationOutput, VpnController, VpnState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
