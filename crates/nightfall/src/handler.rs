//! Per-connection handler: room registration and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the room → get a PlayerId and an outbound queue
//!   2. Spawn a writer that encodes queued payloads onto the socket
//!   3. Loop: receive frames → decode → forward to the room
//!   4. On close, error or `leave`: report the disconnect

use std::sync::Arc;

use nightfall_protocol::{ClientMessage, Codec, PlayerId, ServerMessage};
use nightfall_room::{RoomError, RoomHandle};
use nightfall_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ServerError;

/// Drop guard that tells the room a player is gone when the handler exits.
///
/// Runs even if the handler task panics or is aborted. `Drop` is
/// synchronous, so the notification is a spawned fire-and-forget task.
struct ConnectionGuard {
    player_id: PlayerId,
    room: RoomHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let room = self.room.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                let _ = room.disconnect(player_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec + Copy>(
    conn: WebSocketConnection,
    room: RoomHandle,
    codec: C,
) -> Result<(), ServerError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let player_id = match room.connect(tx).await {
        Ok(id) => id,
        Err(RoomError::RoomFull(max)) => {
            tracing::info!(%conn_id, max, "room full, refusing connection");
            let notice = codec.encode(&ServerMessage::Log {
                text: format!("The room is full ({max} players)."),
                emph: true,
            })?;
            let _ = conn.send(&notice).await;
            let _ = conn.close().await;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let _guard = ConnectionGuard {
        player_id,
        room: room.clone(),
    };
    tracing::info!(%conn_id, %player_id, "player connected");

    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match codec.encode(&msg) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "failed to encode payload");
                    continue;
                }
            };
            if let Err(e) = writer_conn.send(&frame).await {
                tracing::debug!(%player_id, error = %e, "send failed, stopping writer");
                break;
            }
        }
    });

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let msg: ClientMessage = match codec.decode(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "discarding undecodable frame");
                continue;
            }
        };

        if msg == ClientMessage::Leave {
            tracing::info!(%player_id, "player asked to leave");
            break;
        }

        if let Err(e) = room.send_message(player_id, msg).await {
            tracing::debug!(%player_id, error = %e, "room unavailable");
            break;
        }
    }

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → room disconnect fires.
    Ok(())
}
