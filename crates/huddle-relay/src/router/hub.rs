//! Signal hub: turns inbound client events into registry/coordinator calls
//! and re-emits the outcomes to the affected connection handles.

use std::sync::Arc;

use tracing::{debug, info};

use huddle_proto::{Advice, ConnectMeta, JoinRequest, PingAnswer, ServerEvent, Token};

use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::sessions::SessionCoordinator;

/// Advice reason for join attempts from connections that never ran `init`.
pub const REASON_NOT_REGISTERED: &str = "Connection not registered";

/// Routes events between live connections and the two presence stores.
///
/// Peer resolution is two lookups: coordinator for the token, registry for
/// the handle. A peer that disconnected between the two simply resolves to
/// no handle and that one recipient is dropped; a broadcast never fails as
/// a whole.
#[derive(Clone)]
pub struct SignalHub {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionCoordinator>,
}

impl SignalHub {
    pub fn new(registry: Arc<ConnectionRegistry>, sessions: Arc<SessionCoordinator>) -> Self {
        Self { registry, sessions }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionCoordinator> {
        &self.sessions
    }

    /// Register a connection and hand its token back through the handle.
    pub async fn init(&self, handle: ConnectionHandle, meta: &ConnectMeta) -> Token {
        let token = self.registry.create(handle.clone(), meta).await;
        Self::emit(
            &handle,
            ServerEvent::Token {
                token: token.clone(),
            },
        )
        .await;
        token
    }

    /// Join a session and answer the caller with readiness advice.
    pub async fn join(
        &self,
        handle: &ConnectionHandle,
        token: &Token,
        request: &JoinRequest,
    ) -> Advice {
        let advice = self.sessions.join_session(request, token).await;
        Self::emit(handle, ServerEvent::Advice(advice.clone())).await;
        advice
    }

    /// Answer a liveness probe for an identity.
    pub async fn ping(&self, handle: &ConnectionHandle, identity: Option<&str>) -> PingAnswer {
        let answer = self.registry.ping(identity).await;
        Self::emit(handle, ServerEvent::PingAnswer(answer.clone())).await;
        answer
    }

    /// Answer the current peer map of a session, excluding the caller.
    pub async fn peers(&self, handle: &ConnectionHandle, session_id: &str, identity: &str) {
        let peers = self.sessions.get_peers(session_id, identity).await;
        Self::emit(handle, ServerEvent::Peers { peers }).await;
    }

    /// Relay a call invitation to the connection addressed by `to`.
    pub async fn call_request(&self, from: &Token, to: &Token) {
        match self.registry.get(to).await {
            Some(receiver) => {
                Self::emit(&receiver, ServerEvent::CallRequest { from: from.clone() }).await;
            }
            None => debug!(to = %to, "Call request for a gone connection"),
        }
    }

    /// Relay call-setup data; tell the sender when the peer is gone.
    pub async fn call(
        &self,
        handle: &ConnectionHandle,
        from: &Token,
        to: &Token,
        data: serde_json::Value,
    ) {
        match self.registry.get(to).await {
            Some(receiver) => {
                Self::emit(
                    &receiver,
                    ServerEvent::Call {
                        from: from.clone(),
                        data,
                    },
                )
                .await;
            }
            None => {
                Self::emit(handle, ServerEvent::CallFailed { to: to.clone() }).await;
            }
        }
    }

    /// Relay the end of a call to the connection addressed by `to`.
    pub async fn end_call(&self, from: &Token, to: &Token) {
        match self.registry.get(to).await {
            Some(receiver) => {
                Self::emit(&receiver, ServerEvent::CallEnded { from: from.clone() }).await;
            }
            None => debug!(to = %to, "Call end for a gone connection"),
        }
    }

    /// Fan a payload out to every session peer of `identity`.
    ///
    /// Peers whose handle is gone are skipped one by one; the rest still
    /// receive the payload.
    pub async fn broadcast(&self, session_id: &str, identity: &str, data: serde_json::Value) {
        let peers = self.sessions.get_peers(session_id, identity).await;
        for (peer_identity, peer_token) in peers {
            let Some(receiver) = self.registry.get(&peer_token).await else {
                debug!(peer = %peer_identity, "Skipping broadcast to a gone peer");
                continue;
            };
            Self::emit(
                &receiver,
                ServerEvent::Broadcast {
                    from: identity.to_string(),
                    data: data.clone(),
                },
            )
            .await;
        }
    }

    /// Tear down both stores for a closed connection.
    pub async fn disconnect(&self, token: &Token) {
        self.registry.remove(token).await;
        if self.sessions.disconnect(token).await {
            info!(token = %token, "Session membership torn down");
        }
    }

    /// Send one event into a handle, dropping it when the peer is gone.
    pub async fn emit(handle: &ConnectionHandle, event: ServerEvent) {
        if handle.send(event).await.is_err() {
            debug!("Dropped event for a closed connection");
        }
    }
}
