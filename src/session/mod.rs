//! Session cache types and the backend collaborator interface.
//!
//! This module provides:
//! - `Session` and friends - the client's read-mostly cache of backend truth
//! - `SessionBackend` - the create/list/close interface the core calls

pub mod backend;
pub mod types;

pub use backend::{SessionBackend, SessionSnapshot};
pub use types::{AgentState, ProjectId, ProjectTerminalGroup, Session, SessionId, SessionMode};
