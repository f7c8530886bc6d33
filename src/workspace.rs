//! Workspace coordinator: wires the session cache, slot ordering, layout,
//! mounts, and persistence into one event-loop-driven surface.
//!
//! The owner (a UI shell) calls `refresh_sessions` when backend state may
//! have changed, forwards user actions, and calls `tick` from its frame loop
//! with the current instant. Everything underneath is synchronous and
//! single-threaded apart from the socket threads owned by the channels.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::layout::persist::{DebouncedLayoutSaver, LayoutSink};
use crate::layout::{self, Arrangement, Axis, GeometryMap, LayoutMode, PaneSize};
use crate::mounts::{MountPool, MAX_MOUNTED};
use crate::ordering::{OrderingStore, MAX_SLOTS};
use crate::scroll::{sequence_for, GestureMapper};
use crate::session::{ProjectTerminalGroup, Session, SessionBackend, SessionId, SessionMode};
use crate::slots::{self, PanelId, Slot};
use crate::transport::channel::{ChannelConfig, ChannelStatus, ConnectionChannel, Connector};
use crate::transport::endpoint::{resolve_ws_origin, session_url};

/// The client core: one instance per window.
pub struct Workspace {
    backend: Box<dyn SessionBackend>,
    config: Config,
    /// Cached backend truth, refreshed on demand.
    groups: Vec<ProjectTerminalGroup>,
    ad_hoc: Vec<Session>,
    ordering: OrderingStore,
    layout_mode: LayoutMode,
    geometry: GeometryMap,
    mounts: MountPool,
    saver: DebouncedLayoutSaver,
    sink: Box<dyn LayoutSink>,
    connector: Arc<dyn Connector>,
    /// Resolved once at construction; all session URLs derive from it.
    ws_origin: String,
    /// The slot shown in single view and preferred for focus.
    active_panel: Option<PanelId>,
    /// Per-pane scroll gesture accumulators.
    gestures: HashMap<PanelId, GestureMapper>,
    /// Total character grid available to the layout (cols, rows).
    viewport: (u16, u16),
}

impl Workspace {
    /// Build a workspace for a page origin.
    pub fn new(
        backend: Box<dyn SessionBackend>,
        config: Config,
        sink: Box<dyn LayoutSink>,
        connector: Arc<dyn Connector>,
        origin: &str,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let ws_origin = resolve_ws_origin(origin, &config.endpoint);
        tracing::debug!(%origin, %ws_origin, "workspace endpoint resolved");

        Ok(Self {
            backend,
            saver: DebouncedLayoutSaver::new(&config.persistence),
            config,
            groups: Vec::new(),
            ad_hoc: Vec::new(),
            ordering: OrderingStore::new(),
            layout_mode: LayoutMode::Single,
            geometry: GeometryMap::new(),
            mounts: MountPool::new(),
            sink,
            connector,
            ws_origin,
            active_panel: None,
            gestures: HashMap::new(),
            viewport: (80, 24),
        })
    }

    /// Re-fetch the session list and reconcile ordering and mounts with it.
    pub fn refresh_sessions(&mut self) -> Result<()> {
        let snapshot = self.backend.list_sessions().context("listing sessions")?;
        self.groups = snapshot.groups;
        self.ad_hoc = snapshot.ad_hoc;

        let live: Vec<PanelId> = self.slots().iter().map(Slot::panel_id).collect();
        self.ordering.sync(&live);

        let live_set: HashSet<PanelId> = live.into_iter().collect();
        self.mounts.retain_live(&live_set);
        self.gestures.retain(|id, _| live_set.contains(id));

        // A vanished active slot falls back to the first ordered one.
        let active_live = self
            .active_panel
            .as_deref()
            .is_some_and(|id| live_set.contains(id));
        if !active_live {
            self.active_panel = self.ordering.order().first().cloned();
        }
        Ok(())
    }

    /// The live slot list, derived fresh from the session cache.
    pub fn slots(&self) -> Vec<Slot> {
        slots::derive_slots(&self.groups, &self.ad_hoc)
    }

    /// The slot bound to a panel id, if live.
    pub fn slot(&self, panel_id: &str) -> Option<Slot> {
        self.slots().into_iter().find(|s| s.panel_id() == panel_id)
    }

    /// Current layout mode.
    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    /// The slot shown in single view.
    pub fn active_panel(&self) -> Option<&str> {
        self.active_panel.as_deref()
    }

    /// Connection status for a slot; `Idle` when it has no mount.
    pub fn status(&self, panel_id: &str) -> ChannelStatus {
        self.mounts
            .get(panel_id)
            .map_or(ChannelStatus::Idle, |m| m.channel.status())
    }

    /// Derive the current arrangement.
    ///
    /// Single view shows the active slot; the other modes render the stored
    /// ordering directly.
    pub fn arrangement(&self) -> Arrangement {
        let mut order = self.ordering.order().to_vec();
        if self.layout_mode == LayoutMode::Single {
            if let Some(active) = &self.active_panel {
                if let Some(pos) = order.iter().position(|id| id == active) {
                    let active = order.remove(pos);
                    order.insert(0, active);
                }
            }
        }
        layout::arrange(&order, self.layout_mode, &self.geometry)
    }

    /// Switch layout mode and bring the visible panes' mounts up.
    pub fn set_layout_mode(&mut self, mode: LayoutMode, now: Instant) {
        self.layout_mode = mode;
        let limit = if mode == LayoutMode::Single {
            MAX_MOUNTED
        } else {
            MAX_SLOTS
        };
        self.mounts.set_limit(limit);
        self.sync_mounts(now);
    }

    /// Make a slot active: mount it (reusing a dormant mount when one
    /// exists) and give it focus. Unknown ids are ignored.
    pub fn activate(&mut self, panel_id: &str, now: Instant) {
        if self.slot(panel_id).is_none() {
            tracing::debug!(panel = %panel_id, "activate ignored: no such slot");
            return;
        }
        self.active_panel = Some(panel_id.to_string());
        self.sync_mounts(now);
        self.mounts.focus(panel_id);
    }

    /// Exchange two panes' positions. Survives layout-mode changes.
    pub fn swap_slots(&mut self, a: &str, b: &str) {
        self.ordering.swap(a, b);
    }

    /// Replace the pane ordering wholesale (drag-reorder).
    pub fn reorder(&mut self, new_order: Vec<PanelId>) {
        self.ordering.reorder(new_order);
    }

    /// Create a session and activate its slot.
    ///
    /// Returns `Ok(None)` when the slot capacity is already reached; the
    /// backend is not called in that case.
    pub fn create_session(
        &mut self,
        working_dir: &str,
        mode: SessionMode,
        now: Instant,
    ) -> Result<Option<SessionId>> {
        if !self.ordering.can_add() {
            tracing::debug!(capacity = MAX_SLOTS, "create refused: slot capacity reached");
            return Ok(None);
        }

        let session_id = self
            .backend
            .create_session(working_dir, mode)
            .context("creating session")?;
        self.refresh_sessions()?;

        if let Some(panel_id) = self
            .slots()
            .iter()
            .find(|s| s.session_id() == session_id)
            .map(Slot::panel_id)
        {
            self.activate(&panel_id, now);
        }
        Ok(Some(session_id))
    }

    /// Close a slot's session permanently.
    ///
    /// The mount is torn down first (timers cancelled, transport shut), so a
    /// stale retry can never fire for a released panel id.
    pub fn close_slot(&mut self, panel_id: &str) -> Result<()> {
        let Some(slot) = self.slot(panel_id) else {
            tracing::debug!(panel = %panel_id, "close ignored: no such slot");
            return Ok(());
        };
        self.mounts.remove(panel_id);
        self.gestures.remove(panel_id);
        self.backend
            .close_session(slot.session_id())
            .context("closing session")?;
        self.refresh_sessions()
    }

    /// Explicit reconnect for a slot, available from any failed state.
    pub fn reconnect(&mut self, panel_id: &str, now: Instant) {
        if let Some(mount) = self.mounts.get_mut(panel_id) {
            mount.channel.reconnect(now);
        }
    }

    /// Forward input bytes to a pane; dropped unless the pane holds focus.
    pub fn forward_input(&mut self, panel_id: &str, bytes: &[u8]) {
        self.mounts.forward_input(panel_id, bytes);
    }

    /// Commit a finished drag-resize and queue the debounced save.
    pub fn commit_resize(&mut self, sizes: &[(PanelId, PaneSize)], now: Instant) {
        let records = layout::commit_resize(&mut self.geometry, sizes);
        self.saver.queue(records, now);
    }

    /// Double-click on the divider between two panes: equal split along the
    /// divider's axis, persisted like any other resize.
    pub fn equalize_divider(&mut self, a: &str, b: &str, axis: Axis, now: Instant) {
        let arrangement = self.arrangement();
        let records = layout::equalize(&mut self.geometry, &arrangement, a, b, axis);
        self.saver.queue(records, now);
    }

    /// Report a new total viewport in character cells and re-fit every
    /// visible pane.
    pub fn resize_viewport(&mut self, cols: u16, rows: u16, now: Instant) {
        self.viewport = (cols, rows);
        self.sync_mounts(now);
    }

    /// Feed a vertical scroll gesture delta for a pane. Each threshold
    /// crossing sends one configured control sequence to the pane's session.
    pub fn handle_scroll(&mut self, panel_id: &str, delta_y: f32) {
        let mapper = self
            .gestures
            .entry(panel_id.to_string())
            .or_insert_with(|| GestureMapper::new(&self.config.gesture));
        let steps = mapper.on_delta(delta_y);
        if steps.is_empty() {
            return;
        }

        let Some(mount) = self.mounts.get_mut(panel_id) else {
            return;
        };
        for step in steps {
            let seq = sequence_for(&self.config.gesture, step).to_string();
            mount.channel.send_input(seq.as_bytes());
        }
    }

    /// A scroll gesture ended; drop the pane's partial accumulation.
    pub fn end_scroll(&mut self, panel_id: &str) {
        if let Some(mapper) = self.gestures.get_mut(panel_id) {
            mapper.reset();
        }
    }

    /// Drive timers, sockets, and pending saves. Call once per frame.
    pub fn tick(&mut self, now: Instant) {
        self.mounts.pump(now);
        self.saver.tick(now, self.sink.as_mut());
    }

    /// Flush pending layout saves. Called on teardown so a final resize
    /// isn't lost to the debounce window.
    pub fn shutdown(&mut self) {
        self.saver.flush_now(self.sink.as_mut());
    }

    /// Ensure every visible pane has a mount sized to its placement.
    fn sync_mounts(&mut self, now: Instant) {
        let arrangement = self.arrangement();
        let slots = self.slots();
        let previous_focus = self.mounts.focused().map(ToString::to_string);

        struct Target {
            panel_id: PanelId,
            session_id: SessionId,
            working_dir: Option<String>,
            cols: u16,
            rows: u16,
        }

        let targets: Vec<Target> = arrangement
            .visible
            .iter()
            .filter_map(|placement| {
                let slot = slots.iter().find(|s| s.panel_id() == placement.panel_id)?;
                let (cols, rows) = pane_dims(self.viewport, placement.width_pct, placement.height_pct);
                Some(Target {
                    panel_id: placement.panel_id.clone(),
                    session_id: slot.session_id().to_string(),
                    working_dir: slot.working_dir().map(ToString::to_string),
                    cols,
                    rows,
                })
            })
            .collect();

        for target in targets {
            if let Some(mount) = self.mounts.get_mut(&target.panel_id) {
                if mount.channel.dimensions() != (target.cols, target.rows) {
                    mount.resize(target.cols, target.rows);
                }
                continue;
            }

            let url = session_url(
                &self.ws_origin,
                &target.session_id,
                target.working_dir.as_deref(),
            );
            let chan_config = ChannelConfig::from_connection(&self.config.connection);
            let connector = self.connector.clone();
            let session_id = target.session_id.clone();
            self.mounts
                .activate(&target.panel_id, target.cols, target.rows, now, move || {
                    ConnectionChannel::new(session_id, url, chan_config, connector)
                });
        }

        // Mounting must not steal focus from the pane the user was typing in.
        if let Some(focus) = previous_focus {
            if self.mounts.get(&focus).is_some() {
                self.mounts.focus(&focus);
            }
        } else if let Some(active) = self.active_panel.clone() {
            self.mounts.focus(&active);
        }
    }
}

/// Character-cell dimensions for a pane's percentage share of the viewport.
fn pane_dims(viewport: (u16, u16), width_pct: f64, height_pct: f64) -> (u16, u16) {
    let cols = (f64::from(viewport.0) * width_pct / 100.0).floor() as u16;
    let rows = (f64::from(viewport.1) * height_pct / 100.0).floor() as u16;
    (cols.max(1), rows.max(1))
}
