//! Control API
//!
//! This module provides the command surface and the Unix socket interface
//! that lets out-of-process callers reach it.

mod api;
mod client;
mod handler;
mod server;

pub use api::{ApiError, ApiRequest, ApiResponse, ControlAction};
pub use client::{ControlClient, ToggleReport};
pub use handler::CommandHandler;
pub use server::{ControlServer, DEFAULT_SOCKET_PATH};
