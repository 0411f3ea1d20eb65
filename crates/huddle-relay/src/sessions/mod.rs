//! Session coordination: guide/member matching and readiness tracking.

pub mod coordinator;

pub use coordinator::{SessionCoordinator, SessionState};
