//! Per-connection WebSocket plumbing.
//!
//! Each accepted socket is split into a writer task draining the connection's
//! outbound event queue and a reader loop feeding parsed events to the hub.
//! The outbound queue's send half is the connection handle the registry
//! stores; nothing below this module knows the transport exists.

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use huddle_proto::{Advice, ClientEvent, ServerEvent, Token};

use crate::router::{REASON_NOT_REGISTERED, SignalHub};

use super::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Bridge one socket to the hub until the peer goes away.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(state.send_queue);

    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut token: Option<Token> = None;
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => dispatch(&state.hub, &mut token, &event_tx, event).await,
                Err(error) => debug!(%error, "Ignoring unparsable frame"),
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    // Tear both stores down exactly once, whatever ended the loop
    if let Some(token) = token.take() {
        state.hub.disconnect(&token).await;
        info!(token = %token, "Socket disconnected");
    } else {
        debug!("Socket closed before init");
    }
    writer.abort();
}

/// Route one parsed event to the hub.
///
/// Events that address peers need the caller's token; before `init` those
/// are ignored, and a premature join is answered with a rejection advice.
async fn dispatch(
    hub: &SignalHub,
    token: &mut Option<Token>,
    handle: &mpsc::Sender<ServerEvent>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Init(meta) => {
            *token = Some(hub.init(handle.clone(), &meta).await);
        }
        ClientEvent::JoinSession(request) => match token.as_ref() {
            Some(token) => {
                hub.join(handle, token, &request).await;
            }
            None => {
                SignalHub::emit(
                    handle,
                    ServerEvent::Advice(Advice::rejected(REASON_NOT_REGISTERED)),
                )
                .await;
            }
        },
        ClientEvent::Ping { identity } => {
            hub.ping(handle, identity.as_deref()).await;
        }
        ClientEvent::Peers {
            session_id,
            identity,
        } => {
            hub.peers(handle, &session_id, &identity).await;
        }
        ClientEvent::CallRequest { to } => {
            if let Some(from) = token.as_ref() {
                hub.call_request(from, &to).await;
            }
        }
        ClientEvent::Call { to, data } => {
            if let Some(from) = token.as_ref() {
                hub.call(handle, from, &to, data).await;
            }
        }
        ClientEvent::EndCall { to } => {
            if let Some(from) = token.as_ref() {
                hub.end_call(from, &to).await;
            }
        }
        ClientEvent::Broadcast {
            session_id,
            identity,
            data,
        } => {
            hub.broadcast(&session_id, &identity, data).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use huddle_proto::ConnectMeta;

    use crate::registry::ConnectionRegistry;
    use crate::sessions::SessionCoordinator;

    use super::*;

    fn hub() -> SignalHub {
        SignalHub::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(SessionCoordinator::new()),
        )
    }

    #[tokio::test]
    async fn join_before_init_is_rejected_at_the_boundary() {
        let hub = hub();
        let (tx, mut rx) = mpsc::channel(16);
        let mut token = None;

        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"join-session","data":{"sessionId":"24","role":"guide","identity":"1-1"}}"#,
        )
        .unwrap();
        dispatch(&hub, &mut token, &tx, event).await;

        let ServerEvent::Advice(advice) = rx.recv().await.unwrap() else {
            panic!("expected an advice event");
        };
        assert_eq!(advice.reason, REASON_NOT_REGISTERED);
        assert!(token.is_none());
        assert_eq!(hub.sessions().count().await, 0);
    }

    #[tokio::test]
    async fn init_assigns_the_connection_token() {
        let hub = hub();
        let (tx, mut rx) = mpsc::channel(16);
        let mut token = None;

        dispatch(
            &hub,
            &mut token,
            &tx,
            ClientEvent::Init(ConnectMeta {
                identity: "9-9".to_string(),
                name: "raja".to_string(),
            }),
        )
        .await;

        let minted = token.expect("init stores the token");
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::Token {
                token: minted.clone()
            }
        );
        assert!(hub.registry().get(&minted).await.is_some());
    }

    #[tokio::test]
    async fn peer_addressed_events_before_init_are_ignored() {
        let hub = hub();
        let (tx, mut rx) = mpsc::channel(16);
        let mut token = None;

        dispatch(
            &hub,
            &mut token,
            &tx,
            ClientEvent::CallRequest {
                to: Token::from("9-9~raja~1"),
            },
        )
        .await;

        assert!(rx.try_recv().is_err());
    }
}
