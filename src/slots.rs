//! Slot derivation: maps the live session list onto display-addressable slots.
//!
//! Slots are derived, never stored: every call recomputes from the current
//! session cache so the displayed slot can't drift from backend truth. A slot
//! is either bound to a project (sharing the project's identity across its
//! sessions) or wraps a single ad-hoc session.

use crate::session::{AgentState, ProjectTerminalGroup, Session, SessionId, SessionMode};

/// Deterministic unique key for a slot; the join key between ordering and
/// layout state. Stable across re-renders and session restarts.
pub type PanelId = String;

/// Panel id for a project slot.
pub fn project_panel_id(project_id: &str) -> PanelId {
    format!("project:{project_id}")
}

/// Panel id for an ad-hoc slot.
pub fn adhoc_panel_id(session_id: &str) -> PanelId {
    format!("adhoc:{session_id}")
}

/// A display-addressable logical terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A slot bound to a project; its identity survives session restarts.
    Project {
        /// Project identifier.
        project_id: String,
        /// Display name.
        name: String,
        /// Project root path.
        root_path: String,
        /// Mode the project pane currently shows.
        active_mode: SessionMode,
        /// The session currently bound to this slot.
        session_id: SessionId,
        /// 1-based disambiguation badge when several sessions share
        /// project+mode; `None` when the session is unique.
        badge: Option<u32>,
        /// Agent sub-state, when the bound session runs an agent.
        agent_state: Option<AgentState>,
    },
    /// A bare session with no project binding.
    AdHoc {
        /// The wrapped session.
        session_id: SessionId,
        /// Display name.
        name: String,
        /// Working directory, if known.
        working_dir: Option<String>,
    },
}

impl Slot {
    /// The slot's globally unique panel id.
    pub fn panel_id(&self) -> PanelId {
        match self {
            Slot::Project { project_id, .. } => project_panel_id(project_id),
            Slot::AdHoc { session_id, .. } => adhoc_panel_id(session_id),
        }
    }

    /// The session currently bound to this slot.
    pub fn session_id(&self) -> &str {
        match self {
            Slot::Project { session_id, .. } => session_id,
            Slot::AdHoc { session_id, .. } => session_id,
        }
    }

    /// Display name for the slot.
    pub fn display_name(&self) -> &str {
        match self {
            Slot::Project { name, .. } => name,
            Slot::AdHoc { name, .. } => name,
        }
    }

    /// Working directory for the slot, if any.
    pub fn working_dir(&self) -> Option<&str> {
        match self {
            Slot::Project { root_path, .. } => Some(root_path),
            Slot::AdHoc { working_dir, .. } => working_dir.as_deref(),
        }
    }
}

/// Resolve the slot for a given session id.
///
/// Project groups are searched first: a session found inside a project's
/// session set yields a project slot carrying that project's shared identity
/// plus the specific session's badge and sub-state. Ad-hoc sessions are
/// searched second. `None` means "nothing selected", not an error.
pub fn resolve_slot(
    active_session_id: &str,
    groups: &[ProjectTerminalGroup],
    ad_hoc: &[Session],
) -> Option<Slot> {
    for group in groups {
        if let Some(session) = group.session(active_session_id) {
            return Some(project_slot(group, session));
        }
    }

    ad_hoc
        .iter()
        .find(|s| s.session_id == active_session_id)
        .map(adhoc_slot)
}

/// Derive the full live slot list: one project slot per group (bound to the
/// group's active session for its active mode), then one ad-hoc slot per
/// unbound session. Feeds `OrderingStore::sync`.
pub fn derive_slots(groups: &[ProjectTerminalGroup], ad_hoc: &[Session]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(groups.len() + ad_hoc.len());

    for group in groups {
        let active = group
            .active_session_id
            .as_deref()
            .and_then(|id| group.session(id))
            .or_else(|| group.sessions.iter().find(|s| s.mode == group.active_mode));

        if let Some(session) = active {
            slots.push(project_slot(group, session));
        }
    }

    slots.extend(ad_hoc.iter().map(adhoc_slot));
    slots
}

fn project_slot(group: &ProjectTerminalGroup, session: &Session) -> Slot {
    Slot::Project {
        project_id: group.project_id.clone(),
        name: group.name.clone(),
        root_path: group.root_path.clone(),
        active_mode: session.mode,
        session_id: session.session_id.clone(),
        badge: badge_for(group, session),
        agent_state: session.agent_state,
    }
}

fn adhoc_slot(session: &Session) -> Slot {
    let name = session
        .working_dir
        .as_deref()
        .and_then(|dir| dir.rsplit('/').find(|part| !part.is_empty()))
        .unwrap_or(session.session_id.as_str())
        .to_string();

    Slot::AdHoc {
        session_id: session.session_id.clone(),
        name,
        working_dir: session.working_dir.clone(),
    }
}

/// 1-based position among the group's sessions sharing this session's mode.
/// `None` when the session is the only one in that project+mode.
fn badge_for(group: &ProjectTerminalGroup, session: &Session) -> Option<u32> {
    let peers = group.sessions_in_mode(session.mode);
    if peers.len() < 2 {
        return None;
    }
    peers
        .iter()
        .position(|s| s.session_id == session.session_id)
        .map(|idx| idx as u32 + 1)
}
