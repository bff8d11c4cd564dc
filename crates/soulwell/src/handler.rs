//! Per-connection handler: hello, intent routing and event delivery.
//!
//! Each accepted connection gets its own task running this handler:
//!   1. Receive `hello` → check the protocol version → send `welcome`
//!   2. Loop: decode intents and route them; forward room events back
//!
//! A connection is seated in at most one room at a time. If it drops while
//! seated, the room is told so and starts that player's grace period.

use std::sync::Arc;

use soulwell_protocol::{Codec, Envelope, PROTOCOL_VERSION, PlayerId, ProtocolError, RoomId};
use soulwell_room::{
    CODE_CONFLICT, CODE_VALIDATION, ClientIntent, PlayerSender, RoomError, RoomHandle, Seat,
    ServerEvent,
};
use soulwell_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SoulwellError;
use crate::server::ServerState;

/// The room a connection is sitting in.
///
/// Dropping it while still seated reports a disconnect, so a panicking
/// or failing handler still starts the grace period.
struct SeatGuard {
    seat: Option<(RoomHandle, PlayerId)>,
}

impl SeatGuard {
    fn room(&self) -> Option<&(RoomHandle, PlayerId)> {
        self.seat.as_ref()
    }

    fn sit(&mut self, handle: RoomHandle, seat: &Seat) {
        self.seat = Some((handle, seat.player_id));
    }

    fn stand(&mut self) -> Option<(RoomHandle, PlayerId)> {
        self.seat.take()
    }
}

impl Drop for SeatGuard {
    fn drop(&mut self) {
        if let Some((handle, player_id)) = self.seat.take() {
            tokio::spawn(async move {
                let _ = handle.disconnect(player_id).await;
            });
        }
    }
}

/// Encodes events into numbered envelopes on one connection.
struct Outbox<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<C>,
    seq: u64,
}

impl<C: Codec> Outbox<'_, C> {
    async fn send(&mut self, event: &ServerEvent) -> Result<(), SoulwellError> {
        self.seq += 1;
        let envelope = Envelope::new(self.seq, self.state.uptime_ms(), event);
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn error(&mut self, code: u16, message: impl Into<String>) -> Result<(), SoulwellError> {
        self.send(&ServerEvent::error(code, message)).await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SoulwellError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut outbox = Outbox {
        conn: &conn,
        state: &state,
        seq: 0,
    };
    perform_hello(&mut outbox).await?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut guard = SeatGuard { seat: None };
    let idle = state.config.idle_timeout();

    loop {
        tokio::select! {
            frame = tokio::time::timeout(idle, conn.recv()) => {
                let data = match frame {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%conn_id, "connection idle, dropping");
                        break;
                    }
                };

                let intent = match state.codec.decode::<Envelope<ClientIntent>>(&data) {
                    Ok(envelope) => envelope.payload,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "undecodable intent");
                        outbox.error(CODE_VALIDATION, format!("invalid intent: {e}")).await?;
                        continue;
                    }
                };
                handle_intent(intent, &state, &mut outbox, &mut guard, &events_tx).await?;
            }
            Some(event) = events_rx.recv() => {
                if let ServerEvent::RoomClosed { room_id, .. } = &event {
                    if guard.room().is_some_and(|(h, _)| h.room_id() == *room_id) {
                        guard.stand();
                    }
                }
                outbox.send(&event).await?;
            }
        }
    }

    // guard drops here → room hears about the disconnect
    Ok(())
}

/// Waits for `hello` and answers with `welcome`.
async fn perform_hello<C: Codec>(outbox: &mut Outbox<'_, C>) -> Result<(), SoulwellError> {
    let timeout = outbox.state.config.handshake_timeout();
    let data = match tokio::time::timeout(timeout, outbox.conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ProtocolError::InvalidMessage("hello timed out".into()).into()),
    };

    let version = match outbox.state.codec.decode::<Envelope<ClientIntent>>(&data) {
        Ok(Envelope {
            payload: ClientIntent::Hello { version },
            ..
        }) => version,
        _ => {
            outbox.error(CODE_VALIDATION, "expected hello").await?;
            return Err(ProtocolError::InvalidMessage("first intent must be hello".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        outbox
            .error(
                CODE_VALIDATION,
                format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    outbox
        .send(&ServerEvent::Welcome {
            protocol_version: PROTOCOL_VERSION,
        })
        .await
}

async fn handle_intent<C: Codec>(
    intent: ClientIntent,
    state: &ServerState<C>,
    outbox: &mut Outbox<'_, C>,
    guard: &mut SeatGuard,
    events_tx: &PlayerSender,
) -> Result<(), SoulwellError> {
    let settings = intent.room_settings();
    let intent = match intent.into_action() {
        Ok(action) => {
            match guard.room() {
                Some((handle, player_id)) => {
                    if let Err(e) = handle.act(*player_id, action).await {
                        outbox.send(&ServerEvent::from(&e)).await?;
                    }
                }
                None => outbox.error(CODE_VALIDATION, "not in a room").await?,
            }
            return Ok(());
        }
        Err(other) => other,
    };

    match intent {
        ClientIntent::Hello { .. } => {
            outbox.error(CODE_VALIDATION, "already greeted").await?;
        }

        ClientIntent::CreateRoom { player_name, .. } => {
            if let Some(room_id) = seated_in(guard) {
                return outbox.error(CODE_CONFLICT, already_seated(room_id)).await;
            }
            let settings = settings.unwrap_or_default();
            let created = state.rooms.lock().await.create_room(&settings);
            let result = match created {
                Ok(handle) => {
                    let joined = handle.join(player_name, events_tx.clone()).await;
                    if joined.is_err() {
                        let _ = handle.shutdown().await;
                    }
                    joined.map(|seat| (handle, seat))
                }
                Err(e) => Err(e),
            };
            seat_or_report(result, outbox, guard).await?;
        }

        ClientIntent::JoinRoom {
            room_id,
            player_name,
        } => {
            if let Some(current) = seated_in(guard) {
                return outbox.error(CODE_CONFLICT, already_seated(current)).await;
            }
            let handle = state.rooms.lock().await.room(room_id);
            let result = match handle {
                Ok(handle) => handle
                    .join(player_name, events_tx.clone())
                    .await
                    .map(|seat| (handle, seat)),
                Err(e) => Err(e),
            };
            seat_or_report(result, outbox, guard).await?;
        }

        ClientIntent::Reconnect {
            room_id,
            player_id,
            token,
        } => {
            if let Some(current) = seated_in(guard) {
                return outbox.error(CODE_CONFLICT, already_seated(current)).await;
            }
            let handle = state.rooms.lock().await.room(room_id);
            let result = match handle {
                Ok(handle) => handle
                    .reconnect(player_id, token, events_tx.clone())
                    .await
                    .map(|seat| (handle, seat)),
                Err(e) => Err(e),
            };
            match result {
                Ok((handle, seat)) => {
                    tracing::info!(room_id = %seat.room_id, player_id = %seat.player_id, "seat restored");
                    guard.sit(handle, &seat);
                }
                Err(e) => {
                    outbox
                        .send(&ServerEvent::ReconnectionFailed {
                            message: e.to_string(),
                        })
                        .await?;
                }
            }
        }

        ClientIntent::LeaveRoom => match guard.stand() {
            Some((handle, player_id)) => {
                if let Err(e) = handle.leave(player_id).await {
                    tracing::debug!(%player_id, error = %e, "leave failed");
                    outbox.send(&ServerEvent::from(&e)).await?;
                }
            }
            None => outbox.error(CODE_VALIDATION, "not in a room").await?,
        },

        ClientIntent::ListRooms => {
            let rooms = state.rooms.lock().await.list_rooms().await;
            outbox.send(&ServerEvent::RoomList { rooms }).await?;
        }

        ClientIntent::Heartbeat { client_time } => {
            outbox
                .send(&ServerEvent::HeartbeatAck {
                    client_time,
                    server_time: state.uptime_ms(),
                })
                .await?;
        }

        // room actions were routed above
        ClientIntent::SetReady { .. }
        | ClientIntent::StartGame
        | ClientIntent::AddBot { .. }
        | ClientIntent::PlayCard { .. }
        | ClientIntent::TakeDiscardPile => {}
    }
    Ok(())
}

async fn seat_or_report<C: Codec>(
    result: Result<(RoomHandle, Seat), RoomError>,
    outbox: &mut Outbox<'_, C>,
    guard: &mut SeatGuard,
) -> Result<(), SoulwellError> {
    match result {
        Ok((handle, seat)) => {
            tracing::info!(room_id = %seat.room_id, player_id = %seat.player_id, "player seated");
            guard.sit(handle, &seat);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "seating failed");
            outbox.send(&ServerEvent::from(&e)).await
        }
    }
}

fn seated_in(guard: &SeatGuard) -> Option<RoomId> {
    guard.room().map(|(handle, _)| handle.room_id())
}

fn already_seated(room_id: RoomId) -> String {
    format!("already seated in room {room_id}")
}
