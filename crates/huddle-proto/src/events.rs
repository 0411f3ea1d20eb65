//! Wire-level events exchanged between clients and the relay.
//!
//! Every event travels as one JSON text frame shaped
//! `{"event": "<name>", "data": {...}}`. Inbound and outbound vocabularies
//! are distinct enums so each side only ever parses what it can handle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Session role carried in a join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guide,
    Coach,
    Member,
}

impl Role {
    /// Parse a permitted role name; `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "guide" => Some(Self::Guide),
            "coach" => Some(Self::Coach),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Guides and coaches both occupy the single privileged slot of a session.
    pub fn is_guide(self) -> bool {
        matches!(self, Self::Guide | Self::Coach)
    }
}

/// Display fields a connection announces when it registers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectMeta {
    /// Stable fuzzy identity of the participant, shared across devices.
    pub identity: String,
    /// Display name, embedded in the minted token.
    pub name: String,
}

/// Join request payload.
///
/// Fields arrive from the wire unvalidated; the coordinator answers
/// incomplete requests with a structured rejection advice instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRequest {
    pub session_id: Option<String>,
    pub role: Option<String>,
    pub identity: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceStatus {
    Ok,
    No,
}

/// Readiness verdict returned after a join attempt.
///
/// Re-emitted to the wire unchanged: `status` and `reason` are always
/// present, the session fields only once the session is ready.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub status: AdviceStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_socket_id: Option<Token>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<HashMap<String, Token>>,
}

impl Advice {
    pub const AWAITING_MEMBER: &'static str = "Awaiting Member";
    pub const AWAITING_GUIDE: &'static str = "Awaiting Guide";
    pub const READY: &'static str = "Ready";

    /// A `status: no` advice with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: AdviceStatus::No,
            reason: reason.into(),
            session_id: None,
            guide_socket_id: None,
            members: None,
        }
    }

    /// The session has a guide but no member yet.
    pub fn awaiting_member() -> Self {
        Self::rejected(Self::AWAITING_MEMBER)
    }

    /// The session has members but no guide yet.
    pub fn awaiting_guide() -> Self {
        Self::rejected(Self::AWAITING_GUIDE)
    }

    /// Both roles are present: carry the full peer addressing material.
    pub fn ready(
        session_id: impl Into<String>,
        guide_socket_id: Token,
        members: HashMap<String, Token>,
    ) -> Self {
        Self {
            status: AdviceStatus::Ok,
            reason: Self::READY.to_string(),
            session_id: Some(session_id.into()),
            guide_socket_id: Some(guide_socket_id),
            members: Some(members),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == AdviceStatus::Ok
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Ok,
    No,
    Error,
}

/// Liveness answer for an identity probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingAnswer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub status: PingStatus,
}

/// Inbound events the relay consumes, one tagged variant per event kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Register this connection and receive a token.
    Init(ConnectMeta),
    /// Join a session as guide/coach or member.
    JoinSession(JoinRequest),
    /// Probe whether an identity has any live connection.
    #[serde(rename_all = "camelCase")]
    Ping { identity: Option<String> },
    /// Ask for the current peer map of a session, excluding the caller.
    #[serde(rename_all = "camelCase")]
    Peers { session_id: String, identity: String },
    /// Ask a peer (addressed by token) to start a call.
    #[serde(rename_all = "camelCase")]
    CallRequest { to: Token },
    /// Deliver call-setup data to a peer addressed by token.
    #[serde(rename_all = "camelCase")]
    Call {
        to: Token,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Tell a peer the call is over.
    #[serde(rename_all = "camelCase")]
    EndCall { to: Token },
    /// Fan a live-annotation payload out to every session peer.
    #[serde(rename_all = "camelCase")]
    Broadcast {
        session_id: String,
        identity: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// Outbound events the relay emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The token minted for this connection by `init`.
    #[serde(rename_all = "camelCase")]
    Token { token: Token },
    /// Readiness verdict after a join attempt.
    Advice(Advice),
    /// Answer to a liveness probe.
    PingAnswer(PingAnswer),
    /// Current peer map of a session.
    #[serde(rename_all = "camelCase")]
    Peers { peers: HashMap<String, Token> },
    /// A peer asks this connection to start a call.
    #[serde(rename_all = "camelCase")]
    CallRequest { from: Token },
    /// Call-setup data from a peer.
    #[serde(rename_all = "camelCase")]
    Call {
        from: Token,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// The addressed peer was gone; the call could not be delivered.
    #[serde(rename_all = "camelCase")]
    CallFailed { to: Token },
    /// A peer ended the call.
    #[serde(rename_all = "camelCase")]
    CallEnded { from: Token },
    /// A live-annotation payload from a session peer.
    #[serde(rename_all = "camelCase")]
    Broadcast {
        from: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}
