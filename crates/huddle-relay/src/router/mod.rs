//! Event routing between transport connections, the registry, and the
//! session coordinator.

pub mod hub;

pub use hub::{REASON_NOT_REGISTERED, SignalHub};
