//! In-memory connection registry for presence tracking.

use std::collections::{HashMap, HashSet};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_proto::{ConnectMeta, PingAnswer, PingStatus, ServerEvent, Token};

/// Transport send half of one live connection.
///
/// The registry associates handles with tokens and hands them back out; it
/// never reads from them or inspects them beyond that.
pub type ConnectionHandle = mpsc::Sender<ServerEvent>;

#[derive(Default)]
struct RegistryState {
    /// token -> live handle
    connections: HashMap<Token, ConnectionHandle>,
    /// identity -> currently live tokens
    tokens: HashMap<String, HashSet<Token>>,
}

/// Tracks which connection handles exist right now for which identity.
///
/// A participant keeps one stable fuzzy identity across devices, so an
/// identity maps to a set of tokens, one per live connection. Both maps live
/// behind a single lock: a token never appears in one without the other.
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Mint a token for a new connection and record its handle.
    ///
    /// The token's first two segments are the identity and display name from
    /// `meta`; the third is a fresh random suffix, unique for the process
    /// lifetime.
    pub async fn create(&self, handle: ConnectionHandle, meta: &ConnectMeta) -> Token {
        let suffix = Uuid::new_v4().simple().to_string();
        let token = Token::compose(&meta.identity, &meta.name, &suffix);

        let mut state = self.state.write().await;
        state.connections.insert(token.clone(), handle);
        state
            .tokens
            .entry(meta.identity.clone())
            .or_default()
            .insert(token.clone());
        info!(identity = %meta.identity, token = %token, "Connection registered");
        token
    }

    /// Resolve a token to its live handle.
    pub async fn get(&self, token: &Token) -> Option<ConnectionHandle> {
        self.state.read().await.connections.get(token).cloned()
    }

    /// All live handles for an identity; empty for an unknown identity.
    pub async fn get_sockets(&self, identity: &str) -> Vec<ConnectionHandle> {
        let state = self.state.read().await;
        state
            .tokens
            .get(identity)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|token| state.connections.get(token).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All live tokens for an identity; used by tests and diagnostics.
    pub async fn get_tokens(&self, identity: &str) -> HashSet<Token> {
        self.state
            .read()
            .await
            .tokens
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Liveness probe: does this identity have any live connection?
    ///
    /// A missing or empty identity answers with the `error` tier rather than
    /// failing the caller.
    pub async fn ping(&self, identity: Option<&str>) -> PingAnswer {
        let Some(identity) = identity.filter(|id| !id.is_empty()) else {
            return PingAnswer {
                identity: None,
                status: PingStatus::Error,
            };
        };

        let state = self.state.read().await;
        let status = if state.tokens.get(identity).is_some_and(|t| !t.is_empty()) {
            PingStatus::Ok
        } else {
            PingStatus::No
        };
        PingAnswer {
            identity: Some(identity.to_string()),
            status,
        }
    }

    /// Drop a token from the handle map and from its identity's set.
    ///
    /// Safe to call repeatedly and with tokens that were never registered; a
    /// token lacking the segment separator is ignored.
    pub async fn remove(&self, token: &Token) {
        let Some(identity) = token.identity() else {
            warn!(token = %token, "Ignoring removal of malformed token");
            return;
        };

        let mut state = self.state.write().await;
        if state.connections.remove(token).is_none() {
            debug!(token = %token, "Removal of unknown token");
            return;
        }
        if let Some(tokens) = state.tokens.get_mut(identity) {
            tokens.remove(token);
            if tokens.is_empty() {
                state.tokens.remove(identity);
            }
        }
        info!(token = %token, "Connection unregistered");
    }

    /// Forget every connection. Teardown for test isolation.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.connections.clear();
        state.tokens.clear();
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(identity: &str, name: &str) -> ConnectMeta {
        ConnectMeta {
            identity: identity.to_string(),
            name: name.to_string(),
        }
    }

    fn handle() -> (ConnectionHandle, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(16)
    }

    #[tokio::test]
    async fn create_mints_token_with_identity_and_name_segments() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = handle();

        let token = registry.create(tx, &meta("9-9", "raja")).await;

        let segments: Vec<&str> = token.as_str().split('~').collect();
        assert_eq!(segments[0], "9-9");
        assert_eq!(segments[1], "raja");
        assert!(!segments[2].is_empty());
    }

    #[tokio::test]
    async fn tokens_are_unique_per_connection() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = handle();
        let (tx2, _rx2) = handle();

        let token1 = registry.create(tx1, &meta("9-9", "raja")).await;
        let token2 = registry.create(tx2, &meta("9-9", "raja")).await;

        assert_ne!(token1, token2);
        assert_eq!(registry.get_tokens("9-9").await.len(), 2);
    }

    #[tokio::test]
    async fn get_resolves_the_matching_handle() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = handle();
        let (tx2, mut rx2) = handle();

        let _token1 = registry.create(tx1, &meta("9-9", "raja")).await;
        let token2 = registry.create(tx2, &meta("9-9", "raja")).await;

        let resolved = registry.get(&token2).await.unwrap();
        resolved
            .send(ServerEvent::Token {
                token: token2.clone(),
            })
            .await
            .unwrap();

        assert_eq!(rx2.recv().await.unwrap(), ServerEvent::Token { token: token2 });
    }

    #[tokio::test]
    async fn get_unknown_token_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.get(&Token::from("9-9~raja~404")).await.is_none());
    }

    #[tokio::test]
    async fn get_sockets_counts_live_handles_per_identity() {
        let registry = ConnectionRegistry::new();
        for _ in 0..3 {
            let (tx, _rx) = handle();
            registry.create(tx, &meta("9-9", "raja")).await;
        }
        for _ in 0..2 {
            let (tx, _rx) = handle();
            registry.create(tx, &meta("1-1", "gopal")).await;
        }

        assert_eq!(registry.get_sockets("9-9").await.len(), 3);
        assert_eq!(registry.get_sockets("1-1").await.len(), 2);
        assert_eq!(registry.get_sockets("x-x").await.len(), 0);
    }

    #[tokio::test]
    async fn remove_drops_token_and_handle_together() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = handle();
        let (tx2, _rx2) = handle();

        let _token1 = registry.create(tx1, &meta("9-9", "raja")).await;
        let token2 = registry.create(tx2, &meta("9-9", "raja")).await;
        assert_eq!(registry.get_tokens("9-9").await.len(), 2);

        registry.remove(&token2).await;

        assert!(registry.get(&token2).await.is_none());
        assert_eq!(registry.get_tokens("9-9").await.len(), 1);
        assert_eq!(registry.get_sockets("9-9").await.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_graceful_for_bad_input() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = handle();
        let token = registry.create(tx, &meta("9-9", "raja")).await;

        // No separator at all
        registry.remove(&Token::from("x")).await;
        // Well-formed but never registered
        registry.remove(&Token::from("1-1~gopal~404")).await;
        // Removing the same token repeatedly
        registry.remove(&token).await;
        registry.remove(&token).await;
        registry.remove(&token).await;

        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn ping_answers_in_three_tiers() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = handle();
        let token = registry.create(tx, &meta("9-9", "raja")).await;

        let answer = registry.ping(Some("9-9")).await;
        assert_eq!(answer.identity.as_deref(), Some("9-9"));
        assert_eq!(answer.status, PingStatus::Ok);

        registry.remove(&token).await;
        assert_eq!(registry.ping(Some("9-9")).await.status, PingStatus::No);

        assert_eq!(registry.ping(None).await.status, PingStatus::Error);
        assert_eq!(registry.ping(Some("")).await.status, PingStatus::Error);
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = handle();
        registry.create(tx, &meta("9-9", "raja")).await;

        registry.clear().await;

        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(registry.get_tokens("9-9").await.len(), 0);
    }
}
