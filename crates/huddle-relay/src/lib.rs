//! Huddle Relay Server Library
//!
//! Core functionality for the Huddle signaling relay:
//! - Connection registry mapping fuzzy identities to live connection handles
//! - Session coordinator matching guides with members and tracking readiness
//! - Event hub routing inbound client events back out to resolved handles
//! - Thin WebSocket front door and health probe

pub mod registry;
pub mod router;
pub mod server;
pub mod sessions;
