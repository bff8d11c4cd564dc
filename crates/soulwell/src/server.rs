//! `SoulwellServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → rooms.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use soulwell_game::BotMover;
use soulwell_protocol::{Codec, JsonCodec};
use soulwell_room::{RoomConfig, RoomManager};
use soulwell_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::SoulwellError;
use crate::handler::handle_connection;

/// Everything the server reads from its config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// How long a new connection has to send `hello`.
    pub handshake_timeout_secs: u64,
    /// A connection silent for this long is dropped. Clients keep it open
    /// with `heartbeat`.
    pub idle_timeout_secs: u64,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            handshake_timeout_secs: 5,
            idle_timeout_secs: 60,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, SoulwellError> {
        serde_json::from_str(json).map_err(|e| SoulwellError::Config(e.to_string()))
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SoulwellError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Shared by every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    /// Envelope timestamps and `serverTime` count from here.
    pub(crate) started: Instant,
}

impl<C: Codec> ServerState<C> {
    pub(crate) fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), soulwell::SoulwellError> {
/// use soulwell::prelude::*;
///
/// let server = SoulwellServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct SoulwellServerBuilder {
    config: ServerConfig,
    mover: Option<Arc<dyn BotMover>>,
}

impl SoulwellServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            mover: None,
        }
    }

    /// Replaces the whole config.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Bot policy for every room. Defaults to `CautiousMover`.
    pub fn mover(mut self, mover: Arc<dyn BotMover>) -> Self {
        self.mover = Some(mover);
        self
    }

    /// Binds the listener. Frames are JSON over WebSocket.
    pub async fn build(self) -> Result<SoulwellServer<JsonCodec>, SoulwellError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let rooms = match self.mover {
            Some(mover) => RoomManager::with_mover(self.config.room.clone(), mover),
            None => RoomManager::new(self.config.room.clone()),
        };

        let state = Arc::new(ServerState {
            rooms: Mutex::new(rooms),
            codec: JsonCodec,
            config: self.config,
            started: Instant::now(),
        });
        Ok(SoulwellServer { transport, state })
    }
}

impl Default for SoulwellServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run`](Self::run) to start accepting players.
pub struct SoulwellServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl SoulwellServer<JsonCodec> {
    pub fn builder() -> SoulwellServerBuilder {
        SoulwellServerBuilder::new()
    }
}

impl<C: Codec> SoulwellServer<C> {
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until the process ends, one task per
    /// connection.
    pub async fn run(mut self) -> Result<(), SoulwellError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Soulwell server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config = ServerConfig::from_json(
            r#"{"bind": "0.0.0.0:9000", "room": {"autoStart": true}}"#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.idle_timeout_secs, 60);
        assert!(config.room.auto_start);
        assert_eq!(config.room.resilience.grace_period_secs, 120);
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(matches!(
            ServerConfig::from_json("{bind"),
            Err(SoulwellError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            ServerConfig::load("/nonexistent/soulwell.json"),
            Err(SoulwellError::Io(_))
        ));
    }
}
