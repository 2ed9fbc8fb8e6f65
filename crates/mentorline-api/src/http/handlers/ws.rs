//! WebSocket handler for live session events.
//!
//! The `/ws` endpoint authenticates the bearer token before upgrading; a
//! missing or invalid token is rejected with 401 and no connection is
//! registered. Once connected, the handler:
//!
//! - **Forwards events:** drains the connection's queue in the [`FanOut`]
//!   registry and pushes every [`RealtimeEvent`] as a JSON text frame.
//! - **Receives commands:** parses incoming text frames as [`ClientCommand`]
//!   (subscribe, unsubscribe, typing, presence, ping).
//!
//! Replies to commands go through the same queue as broadcast events, so a
//! connection sees them in enqueue order.
//!
//! [`FanOut`]: mentorline_core::FanOut

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use mentorline_core::realtime::ConnectionId;
use mentorline_types::event::RealtimeEvent;
use mentorline_types::identity::{Principal, Role};

use crate::http::extractors::auth::Authenticated;
use crate::state::AppState;

/// Incoming command from a WebSocket client.
///
/// Clients send JSON-encoded text frames tagged by `type`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Receive `NEW_MESSAGE` and `TYPING` events for a session.
    Subscribe { session_id: Uuid },
    Unsubscribe { session_id: Uuid },
    /// Relayed to the other participant as a `TYPING` event.
    Typing { session_id: Uuid, is_typing: bool },
    /// Mentors only.
    Presence { is_online: bool },
    /// Keep-alive ping. Server responds with `{"type":"PONG"}`.
    Ping,
}

/// Upgrade an authenticated HTTP request to a WebSocket connection.
pub async fn ws_handler(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, principal))
}

/// Core WebSocket connection handler.
///
/// Uses `tokio::select!` to multiplex between the connection's outbound
/// queue and incoming client frames in a single task.
async fn handle_ws_connection(socket: WebSocket, state: AppState, principal: Principal) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (conn_id, mut events) = state.fanout.connect(principal.user_id);

    tracing::info!(
        conn_id = %conn_id,
        user_id = %principal.user_id,
        role = %principal.role,
        "WebSocket connected"
    );
    state.fanout.send_to(
        &conn_id,
        RealtimeEvent::ConnectionSuccess {
            user_id: principal.user_id,
        },
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to serialize RealtimeEvent: {err}");
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match parse_command(text.as_str()) {
                            Ok(cmd) => process_command(&state, &principal, conn_id, cmd).await,
                            Err(message) => Some(RealtimeEvent::Error { message }),
                        };
                        if let Some(reply) = reply {
                            state.fanout.send_to(&conn_id, reply);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Binary, ping and pong frames are handled by axum/tungstenite.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.fanout.disconnect(&conn_id);
    if principal.role == Role::Mentor {
        if let Err(e) = state.presence.on_disconnect(&principal.user_id).await {
            tracing::warn!(user_id = %principal.user_id, error = %e, "Failed to record mentor offline");
        }
    }
    tracing::info!(conn_id = %conn_id, user_id = %principal.user_id, "WebSocket closed");
}

/// Parse a client frame.
pub fn parse_command(text: &str) -> Result<ClientCommand, String> {
    serde_json::from_str(text).map_err(|err| {
        tracing::warn!(raw = %text, error = %err, "Malformed WebSocket command");
        format!("malformed command: {err}")
    })
}

/// Apply a command for connection `conn_id`. Returns the reply to enqueue,
/// if any.
pub async fn process_command(
    state: &AppState,
    principal: &Principal,
    conn_id: ConnectionId,
    cmd: ClientCommand,
) -> Option<RealtimeEvent> {
    match cmd {
        ClientCommand::Subscribe { session_id } => {
            match state.sessions.get(&session_id).await {
                Ok(session) if session.is_participant(principal.user_id) => {
                    state.fanout.subscribe(&conn_id, session_id);
                    tracing::debug!(conn_id = %conn_id, session_id = %session_id, "Subscribed");
                    Some(RealtimeEvent::Subscribed { session_id })
                }
                Ok(_) => Some(error_event("not a participant of this session")),
                Err(e) => Some(error_event(&e.to_string())),
            }
        }
        ClientCommand::Unsubscribe { session_id } => {
            state.fanout.unsubscribe(&conn_id, &session_id);
            None
        }
        ClientCommand::Typing {
            session_id,
            is_typing,
        } => {
            if !state.fanout.is_subscribed(&conn_id, &session_id) {
                return Some(error_event("subscribe to the session first"));
            }
            state.fanout.broadcast_except(
                &session_id,
                &principal.user_id,
                &RealtimeEvent::Typing {
                    session_id,
                    user_id: principal.user_id,
                    is_typing,
                },
            );
            None
        }
        ClientCommand::Presence { is_online } => {
            if principal.role != Role::Mentor {
                return Some(error_event("only mentors report presence"));
            }
            match state.presence.set_presence(&principal.user_id, is_online).await {
                Ok(_) => None,
                Err(e) => Some(error_event(&e.to_string())),
            }
        }
        ClientCommand::Ping => Some(RealtimeEvent::Pong),
    }
}

fn error_event(message: &str) -> RealtimeEvent {
    RealtimeEvent::Error {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscribe() {
        let id = Uuid::now_v7();
        let cmd = parse_command(&format!(r#"{{"type":"subscribe","session_id":"{id}"}}"#)).unwrap();
        assert_eq!(cmd, ClientCommand::Subscribe { session_id: id });
    }

    #[test]
    fn test_parse_typing_and_presence() {
        let id = Uuid::now_v7();
        let cmd = parse_command(&format!(
            r#"{{"type":"typing","session_id":"{id}","is_typing":true}}"#
        ))
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Typing {
                session_id: id,
                is_typing: true
            }
        );
        assert_eq!(
            parse_command(r#"{"type":"presence","is_online":false}"#).unwrap(),
            ClientCommand::Presence { is_online: false }
        );
    }

    #[test]
    fn test_parse_ping() {
        assert_eq!(parse_command(r#"{"type":"ping"}"#).unwrap(), ClientCommand::Ping);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_command(r#"{"type":"cancel_agent"}"#).is_err());
        assert!(parse_command("not json").is_err());
    }
}
