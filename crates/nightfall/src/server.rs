//! `NightfallServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room. The server owns
//! one room for its whole lifetime.

use std::future::Future;

use nightfall_protocol::JsonCodec;
use nightfall_room::{RoomConfig, RoomHandle, spawn_room};
use nightfall_transport::{Transport, WebSocketTransport};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::handler::handle_connection;

/// Port used when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 10000;

/// Everything the server needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` to listen on. Port `0` picks a free port.
    pub bind_addr: String,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            room: RoomConfig::default(),
        }
    }
}

/// Builder for configuring and starting a Nightfall server.
///
/// # Example
///
/// ```rust,ignore
/// use nightfall::prelude::*;
///
/// let server = NightfallServer::builder()
///     .bind("0.0.0.0:10000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct NightfallServerBuilder {
    config: ServerConfig,
}

impl NightfallServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Binds the listener and spawns the room actor.
    pub async fn build(self) -> Result<NightfallServer, ServerError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let room = spawn_room(self.config.room);
        Ok(NightfallServer {
            transport,
            room,
            codec: JsonCodec,
        })
    }
}

impl Default for NightfallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Nightfall server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct NightfallServer {
    transport: WebSocketTransport,
    room: RoomHandle,
    codec: JsonCodec,
}

impl NightfallServer {
    /// Creates a new builder.
    pub fn builder() -> NightfallServerBuilder {
        NightfallServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the server's room.
    pub fn room(&self) -> RoomHandle {
        self.room.clone()
    }

    /// Runs until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Accepts connections until `shutdown` resolves, then stops the room.
    ///
    /// Each accepted connection gets its own handler task. Open
    /// connections see the room go away and close on their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        tracing::info!("Nightfall server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let room = self.room.clone();
                        let codec = self.codec;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, room, codec).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        if self.room.shutdown().await.is_err() {
            tracing::debug!("room already stopped");
        }
        tracing::info!("Nightfall server stopped");
        Ok(())
    }
}
