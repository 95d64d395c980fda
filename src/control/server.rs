//! Control socket server
//!
//! Newline-delimited JSON over a Unix socket: every line read is one
//! [`ApiRequest`], every line written back is one [`ApiResponse`].
//!
//! A request that has been read always runs to completion. On
//! [`ControlServer::shutdown`] the server stops accepting, closes idle
//! connections and waits for in-flight requests before it removes the
//! socket, so a toggle is never dropped halfway through its external
//! program.

use crate::config::ControlConfig;
use crate::control::{ApiError, ApiRequest, ApiResponse, CommandHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/vpn-paths-agent.sock";

/// Serves the command surface on a Unix socket
pub struct ControlServer {
    socket_path: PathBuf,
    handler: Arc<CommandHandler>,
    /// Flips to `true` once shutdown begins
    stop: watch::Sender<bool>,
    /// One task per accepted connection
    connections: Mutex<JoinSet<()>>,
}

impl ControlServer {
    /// Create a server for `socket_path`
    pub fn new(socket_path: PathBuf, handler: Arc<CommandHandler>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            socket_path,
            handler,
            stop,
            connections: Mutex::new(JoinSet::new()),
        }
    }

    /// Create a server from the `[control]` configuration section
    pub fn from_config(config: &ControlConfig, handler: Arc<CommandHandler>) -> Self {
        Self::new(config.socket_path.clone(), handler)
    }

    /// Socket this server listens on
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until [`shutdown`](Self::shutdown) is called
    #[cfg(unix)]
    pub async fn start(&self) -> Result<(), ApiError> {
        let listener = self.bind()?;
        let mut stop = self.stop.subscribe();

        info!("Control server listening at {:?}", self.socket_path);

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => {
                    info!("Control server no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => self.spawn_connection(stream).await,
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
    }

    /// Unix domain sockets are unavailable on this platform
    #[cfg(not(unix))]
    pub async fn start(&self) -> Result<(), ApiError> {
        Err(ApiError::InternalError(
            "Control server requires Unix domain sockets".to_string(),
        ))
    }

    /// Stop accepting, wait for in-flight requests, then remove the socket
    pub async fn shutdown(&self) -> Result<(), ApiError> {
        info!("Shutting down control server");
        self.stop.send_replace(true);

        let mut connections = self.connections.lock().await;
        if !connections.is_empty() {
            info!(
                "Waiting for {} connection(s) to finish their requests",
                connections.len()
            );
        }
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                error!("Connection task failed: {}", e);
            }
        }
        drop(connections);

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| {
                ApiError::InternalError(format!("Failed to remove socket: {}", e))
            })?;
        }

        Ok(())
    }

    #[cfg(unix)]
    fn bind(&self) -> Result<UnixListener, ApiError> {
        if self.socket_path.exists() {
            info!("Removing stale socket at {:?}", self.socket_path);
            std::fs::remove_file(&self.socket_path).map_err(|e| {
                ApiError::InternalError(format!("Failed to remove existing socket: {}", e))
            })?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::InternalError(format!("Failed to create socket directory: {}", e))
            })?;
        }

        UnixListener::bind(&self.socket_path)
            .map_err(|e| ApiError::InternalError(format!("Failed to bind Unix socket: {}", e)))
    }

    #[cfg(unix)]
    async fn spawn_connection(&self, stream: UnixStream) {
        let handler = self.handler.clone();
        let stop = self.stop.subscribe();

        let mut connections = self.connections.lock().await;
        while connections.try_join_next().is_some() {}
        connections.spawn(async move {
            if let Err(e) = handle_connection(stream, handler, stop).await {
                error!("Connection handler error: {}", e);
            }
        });
    }
}

/// Resolves once shutdown has begun
async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as stopped
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Serve one client until it disconnects or shutdown begins
///
/// Shutdown is only observed between requests.
#[cfg(unix)]
async fn handle_connection(
    stream: UnixStream,
    handler: Arc<CommandHandler>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), ApiError> {
    debug!("New client connection");

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = stopped(&mut stop) => {
                debug!("Closing idle connection for shutdown");
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Client disconnected");
                break;
            }
            Err(e) => {
                error!("Failed to read from socket: {}", e);
                break;
            }
        };

        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        let mut response = respond(&handler, request).await.to_json()?;
        response.push('\n');

        writer
            .write_all(response.as_bytes())
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to write response: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to flush response: {}", e)))?;
    }

    Ok(())
}

/// Dispatch one request line, turning unparseable input into a parse error
async fn respond(handler: &CommandHandler, line: &str) -> ApiResponse {
    debug!("Received request: {}", line);

    match ApiRequest::from_json(line) {
        Ok(request) => handler.handle_request(request).await,
        Err(e) => {
            warn!("Rejecting malformed request: {}", e);
            ApiResponse::error(
                "unknown".to_string(),
                ApiError::ParseError(format!("Invalid JSON: {}", e)),
            )
        }
    }
}
