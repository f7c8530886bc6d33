//! Backend collaborator interface for session creation and listing.
//!
//! The backend process owns the actual pty/session; the core only needs a
//! read source for the session list and a write sink for create/close user
//! actions. No assumptions are made beyond eventual consistency after a
//! successful create call.

use anyhow::Result;

use super::types::{ProjectTerminalGroup, Session, SessionId, SessionMode};

/// A snapshot of the backend's session list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Sessions grouped by project.
    pub groups: Vec<ProjectTerminalGroup>,
    /// Sessions not bound to any project.
    pub ad_hoc: Vec<Session>,
}

/// Interface to the process that owns sessions.
pub trait SessionBackend {
    /// Create a new session in the given working directory.
    fn create_session(&mut self, working_dir: &str, mode: SessionMode) -> Result<SessionId>;

    /// Fetch the current session list.
    fn list_sessions(&mut self) -> Result<SessionSnapshot>;

    /// Close a session permanently.
    fn close_session(&mut self, session_id: &str) -> Result<()>;
}
