//! Session management core module.
//!
//! This module owns the per-client state of the relay: one entry per connected client
//! holding its bounded traffic history and its current risk score.

/// Submodule for session entry and summary types.
pub mod session;
/// Submodule for the concurrent session registry.
pub mod session_registry;

pub use session::{SessionEntry, SessionSummary};
pub use session_registry::SessionRegistry;
