//! Guide/member matching for named sessions.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, info};

use huddle_proto::{Advice, JoinRequest, Role, Token};

const REASON_MISSING_SESSION: &str = "Missing session identifier";
const REASON_MISSING_IDENTITY: &str = "Missing participant identity";
const REASON_UNKNOWN_ROLE: &str = "Unknown role";
const REASON_NOBODY_JOINED: &str = "Neither Guide nor Member has joined";

/// One occupant of a session.
#[derive(Clone, Debug)]
struct Participant {
    identity: String,
    token: Token,
}

/// Per-session readiness, derived from occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    GuideOnly,
    MembersOnly,
    Ready,
}

#[derive(Default)]
struct CoordinatorState {
    /// session id -> current guide occupant
    guides: HashMap<String, Participant>,
    /// session id -> member identity -> that identity's current token
    members: HashMap<String, HashMap<String, Token>>,
    /// sessions currently counted as running
    running: HashSet<String>,
    /// token -> session it joined, for disconnect resolution
    sessions_by_token: HashMap<Token, String>,
}

impl CoordinatorState {
    fn state_of(&self, session_id: &str) -> SessionState {
        let has_guide = self.guides.contains_key(session_id);
        let has_members = self
            .members
            .get(session_id)
            .is_some_and(|members| !members.is_empty());
        match (has_guide, has_members) {
            (false, false) => SessionState::Empty,
            (true, false) => SessionState::GuideOnly,
            (false, true) => SessionState::MembersOnly,
            (true, true) => SessionState::Ready,
        }
    }

    fn advice_for(&mut self, session_id: &str) -> Advice {
        match self.state_of(session_id) {
            SessionState::Empty => Advice::rejected(REASON_NOBODY_JOINED),
            SessionState::GuideOnly => Advice::awaiting_member(),
            SessionState::MembersOnly => Advice::awaiting_guide(),
            SessionState::Ready => {
                if self.running.insert(session_id.to_string()) {
                    info!(session_id, "Session running");
                }
                let Some(guide) = self.guides.get(session_id) else {
                    // state_of said Ready, so the guide record is present
                    return Advice::rejected(REASON_NOBODY_JOINED);
                };
                let members = self.members.get(session_id).cloned().unwrap_or_default();
                Advice::ready(session_id, guide.token.clone(), members)
            }
        }
    }
}

/// Matches one guide with one-or-more members per session and answers
/// readiness and peer-discovery queries.
///
/// All maps live behind a single lock so a join or teardown is atomic with
/// respect to every reader. Handles never appear here, only tokens: the
/// registry stays the one place that knows about transports.
pub struct SessionCoordinator {
    state: RwLock<CoordinatorState>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CoordinatorState::default()),
        }
    }

    /// Record a join and answer with readiness advice.
    ///
    /// A guide join replaces any prior guide of the session; a member join
    /// replaces only that member identity's own prior token. Incomplete
    /// requests are answered with a rejection advice and mutate nothing.
    pub async fn join_session(&self, request: &JoinRequest, token: &Token) -> Advice {
        let Some(session_id) = request.session_id.as_deref().filter(|id| !id.is_empty()) else {
            return Advice::rejected(REASON_MISSING_SESSION);
        };
        let Some(identity) = request.identity.as_deref().filter(|id| !id.is_empty()) else {
            return Advice::rejected(REASON_MISSING_IDENTITY);
        };
        let Some(role) = request.role.as_deref().and_then(Role::parse) else {
            return Advice::rejected(REASON_UNKNOWN_ROLE);
        };

        let mut state = self.state.write().await;
        if role.is_guide() {
            let previous = state.guides.insert(
                session_id.to_string(),
                Participant {
                    identity: identity.to_string(),
                    token: token.clone(),
                },
            );
            if let Some(previous) = previous {
                state.sessions_by_token.remove(&previous.token);
            }
        } else {
            let members = state.members.entry(session_id.to_string()).or_default();
            if let Some(previous) = members.insert(identity.to_string(), token.clone()) {
                state.sessions_by_token.remove(&previous);
            }
        }
        state
            .sessions_by_token
            .insert(token.clone(), session_id.to_string());

        debug!(session_id, identity, ?role, "Session join recorded");
        state.advice_for(session_id)
    }

    /// Whether the session is currently counted as running.
    pub async fn is_running(&self, session_id: &str) -> bool {
        self.state.read().await.running.contains(session_id)
    }

    /// Number of sessions currently running.
    pub async fn count(&self) -> usize {
        self.state.read().await.running.len()
    }

    /// Readiness of a session as derived from its occupancy.
    pub async fn session_state(&self, session_id: &str) -> SessionState {
        self.state.read().await.state_of(session_id)
    }

    /// Erase every trace of a session. Idempotent.
    pub async fn clear(&self, session_id: &str) {
        let mut state = self.state.write().await;
        state.guides.remove(session_id);
        state.members.remove(session_id);
        state.running.remove(session_id);
        state
            .sessions_by_token
            .retain(|_, session| session != session_id);
    }

    /// Full teardown for test isolation.
    pub async fn clear_all(&self) {
        let mut state = self.state.write().await;
        state.guides.clear();
        state.members.clear();
        state.running.clear();
        state.sessions_by_token.clear();
    }

    /// Tear down whatever the token held in its session.
    ///
    /// Returns `false` for a token that never joined or was already retired.
    /// The record to drop is matched by token, not identity: a token replaced
    /// by a rejoin no longer owns any record. The session leaves the running
    /// index on any disconnect; it re-enters only when a later join observes
    /// both roles present again.
    pub async fn disconnect(&self, token: &Token) -> bool {
        let mut state = self.state.write().await;
        let Some(session_id) = state.sessions_by_token.remove(token) else {
            return false;
        };

        if state
            .guides
            .get(&session_id)
            .is_some_and(|guide| &guide.token == token)
        {
            state.guides.remove(&session_id);
        } else if let Some(members) = state.members.get_mut(&session_id) {
            members.retain(|_, member_token| member_token != token);
            if members.is_empty() {
                state.members.remove(&session_id);
            }
        }

        state.running.remove(&session_id);
        info!(session_id, token = %token, "Participant disconnected");
        true
    }

    /// Current occupants of a session, minus the excluded identity.
    pub async fn get_peers(
        &self,
        session_id: &str,
        exclude_identity: &str,
    ) -> HashMap<String, Token> {
        let state = self.state.read().await;
        let mut peers = HashMap::new();
        if let Some(guide) = state.guides.get(session_id) {
            if guide.identity != exclude_identity {
                peers.insert(guide.identity.clone(), guide.token.clone());
            }
        }
        if let Some(members) = state.members.get(session_id) {
            for (identity, token) in members {
                if identity != exclude_identity {
                    peers.insert(identity.clone(), token.clone());
                }
            }
        }
        peers
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
