//! Session cache types.
//!
//! Sessions are owned by the backend process; the client holds a read-mostly
//! cache refreshed through `SessionBackend::list_sessions`.

use serde::{Deserialize, Serialize};

/// Unique identifier for a session, assigned by the backend.
pub type SessionId = String;

/// Unique identifier for a project known to the backend.
pub type ProjectId = String;

/// What kind of process a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Plain interactive shell.
    Shell,
    /// Long-running agent process with its own sub-state.
    Agent,
}

/// Sub-state of a long-running agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    NotStarted,
    Starting,
    Running,
    Stopped,
    Error,
}

/// A terminal session as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID.
    pub session_id: SessionId,
    /// Session mode.
    pub mode: SessionMode,
    /// Working directory, if the backend reported one.
    pub working_dir: Option<String>,
    /// Whether the remote process is still alive.
    pub is_alive: bool,
    /// Agent sub-state; only meaningful for `SessionMode::Agent`.
    pub agent_state: Option<AgentState>,
}

/// One project's terminal sessions, grouped by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTerminalGroup {
    /// Project identifier shared by all of the group's sessions.
    pub project_id: ProjectId,
    /// Display name for the project.
    pub name: String,
    /// Project root path.
    pub root_path: String,
    /// Which mode the project pane currently shows.
    pub active_mode: SessionMode,
    /// The currently active session for `active_mode`, if any.
    pub active_session_id: Option<SessionId>,
    /// All sessions belonging to this project, across modes.
    pub sessions: Vec<Session>,
}

impl ProjectTerminalGroup {
    /// Find a session of this group by id.
    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    /// Sessions of this group sharing the given mode, in backend order.
    pub fn sessions_in_mode(&self, mode: SessionMode) -> Vec<&Session> {
        self.sessions.iter().filter(|s| s.mode == mode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, mode: SessionMode) -> Session {
        Session {
            session_id: id.to_string(),
            mode,
            working_dir: None,
            is_alive: true,
            agent_state: None,
        }
    }

    #[test]
    fn sessions_in_mode_filters_and_preserves_order() {
        let group = ProjectTerminalGroup {
            project_id: "p1".to_string(),
            name: "demo".to_string(),
            root_path: "/src/demo".to_string(),
            active_mode: SessionMode::Shell,
            active_session_id: Some("s2".to_string()),
            sessions: vec![
                session("s1", SessionMode::Shell),
                session("a1", SessionMode::Agent),
                session("s2", SessionMode::Shell),
            ],
        };

        let shells = group.sessions_in_mode(SessionMode::Shell);
        assert_eq!(shells.len(), 2);
        assert_eq!(shells[0].session_id, "s1");
        assert_eq!(shells[1].session_id, "s2");
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionMode::Agent).unwrap(), "\"agent\"");
        assert_eq!(
            serde_json::to_string(&AgentState::NotStarted).unwrap(),
            "\"not_started\""
        );
    }
}
