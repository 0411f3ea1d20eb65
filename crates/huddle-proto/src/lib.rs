//! Huddle wire vocabulary
//!
//! Message shapes exchanged between clients and the relay as JSON text
//! frames. This crate contains:
//! - `ClientEvent` / `ServerEvent`, the tagged inbound and outbound events
//! - `Advice`, the readiness verdict returned after a join attempt
//! - `PingAnswer`, the liveness probe answer for a fuzzy identity
//! - `Token`, the addressable name of one live connection

pub mod events;
pub mod token;

pub use events::{
    Advice, AdviceStatus, ClientEvent, ConnectMeta, JoinRequest, PingAnswer, PingStatus, Role,
    ServerEvent,
};
pub use token::{TOKEN_SEPARATOR, Token};
