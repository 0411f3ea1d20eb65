//! Connection registry: live connection handles by token and identity.

pub mod connection;

pub use connection::{ConnectionHandle, ConnectionRegistry};
