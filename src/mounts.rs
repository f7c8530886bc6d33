//! Terminal mounts: one embedded terminal grid plus its connection channel
//! per mounted slot.
//!
//! A bounded number of mounts stays attached at once so idle sessions don't
//! accumulate memory and timers. Activating a slot reuses a dormant mount
//! when one exists; otherwise the least-recently-used mount beyond the bound
//! is evicted, never the newly activated one. Every mount keeps processing
//! its session's output, dormant or not, so switching back shows a current
//! grid; only the focused mount forwards input, so a session transiently
//! mounted in two panes can't see duplicate writes.

use std::collections::HashSet;
use std::time::Instant;

use crate::slots::PanelId;
use crate::transport::channel::ConnectionChannel;

/// Renderers kept attached at once in single-view mode.
pub const MAX_MOUNTED: usize = 3;

/// Number of scrollback lines retained per mounted terminal.
pub const SCROLLBACK_LINES: usize = 10_000;

/// One mounted slot: its terminal grid and transport.
pub struct TerminalMount {
    panel_id: PanelId,
    /// VT100 parser for terminal emulation.
    parser: vt100::Parser,
    /// The slot's transport. Owned exclusively by this mount.
    pub channel: ConnectionChannel,
    /// Current scroll offset (0 = live/bottom).
    scroll_offset: usize,
    /// Whether scroll is locked (user scrolled up).
    scroll_locked: bool,
    /// LRU stamp, bumped on every activation.
    last_used: u64,
}

impl TerminalMount {
    fn new(panel_id: PanelId, channel: ConnectionChannel, cols: u16, rows: u16) -> Self {
        Self {
            panel_id,
            parser: vt100::Parser::new(rows, cols, SCROLLBACK_LINES),
            channel,
            scroll_offset: 0,
            scroll_locked: false,
            last_used: 0,
        }
    }

    /// The slot this mount renders.
    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    /// The session the mount's channel is bound to.
    pub fn session_id(&self) -> &str {
        self.channel.session_id()
    }

    /// The terminal screen for rendering.
    pub fn screen(&self) -> &vt100::Screen {
        self.parser.screen()
    }

    /// Resize the grid and notify the channel. The local re-fit happens
    /// regardless of connection state.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.parser = vt100::Parser::new(rows, cols, SCROLLBACK_LINES);
        self.channel.resize(cols, rows);
    }

    /// Feed output chunks into the grid.
    fn process(&mut self, chunks: &[Vec<u8>]) {
        for chunk in chunks {
            self.parser.process(chunk);
        }

        // Auto-scroll to bottom when new output arrives, unless locked.
        if !chunks.is_empty() && !self.scroll_locked {
            self.scroll_offset = 0;
        }

        // Re-apply the tracked scroll position: vt100's process() resets
        // scrollback internally on output.
        self.parser.set_scrollback(self.scroll_offset);
    }

    /// Scroll up by the given number of lines.
    pub fn scroll_up(&mut self, lines: usize) {
        let desired = self.scroll_offset.saturating_add(lines);
        self.parser.set_scrollback(desired);
        self.scroll_offset = self.parser.screen().scrollback();
        if self.scroll_offset > 0 {
            self.scroll_locked = true;
        }
    }

    /// Scroll down by the given number of lines.
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.parser.set_scrollback(self.scroll_offset);
        if self.scroll_offset == 0 {
            self.scroll_locked = false;
        }
    }

    /// Jump to the bottom (live view).
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
        self.scroll_locked = false;
        self.parser.set_scrollback(0);
    }
}

/// Bounded pool of terminal mounts with LRU eviction.
pub struct MountPool {
    mounts: Vec<TerminalMount>,
    focused: Option<PanelId>,
    clock: u64,
    limit: usize,
}

impl Default for MountPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MountPool {
    /// Pool with the default mount bound.
    pub fn new() -> Self {
        Self::with_limit(MAX_MOUNTED)
    }

    /// Pool with a custom mount bound.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            mounts: Vec::new(),
            focused: None,
            clock: 0,
            limit: limit.max(1),
        }
    }

    /// Number of currently mounted slots.
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Whether no slot is mounted.
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Panel ids of the mounted slots, in no particular order.
    pub fn mounted_ids(&self) -> Vec<PanelId> {
        self.mounts.iter().map(|m| m.panel_id.clone()).collect()
    }

    /// Get a mount by panel id.
    pub fn get(&self, panel_id: &str) -> Option<&TerminalMount> {
        self.mounts.iter().find(|m| m.panel_id == panel_id)
    }

    /// Get a mutable mount by panel id.
    pub fn get_mut(&mut self, panel_id: &str) -> Option<&mut TerminalMount> {
        self.mounts.iter_mut().find(|m| m.panel_id == panel_id)
    }

    /// The currently focused panel id, if any.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focus a mounted slot; only the focused mount forwards input.
    pub fn focus(&mut self, panel_id: &str) {
        if self.get(panel_id).is_some() {
            self.focused = Some(panel_id.to_string());
        }
    }

    /// Activate a slot: reuse its dormant mount if present, otherwise create
    /// one with `make_channel`, connect it, and evict the least-recently-used
    /// mount beyond the bound. The newly activated mount is never evicted.
    pub fn activate(
        &mut self,
        panel_id: &str,
        cols: u16,
        rows: u16,
        now: Instant,
        make_channel: impl FnOnce() -> ConnectionChannel,
    ) -> &mut TerminalMount {
        self.clock += 1;
        let stamp = self.clock;

        if let Some(idx) = self.mounts.iter().position(|m| m.panel_id == panel_id) {
            self.mounts[idx].last_used = stamp;
            self.focused = Some(panel_id.to_string());
            return &mut self.mounts[idx];
        }

        // Evict before mounting, so the new mount can never be the victim.
        while self.mounts.len() + 1 > self.limit {
            if !self.evict_lru() {
                break;
            }
        }

        let mut channel = make_channel();
        channel.resize(cols, rows);
        channel.connect(now);

        let mut mount = TerminalMount::new(panel_id.to_string(), channel, cols, rows);
        mount.last_used = stamp;
        self.mounts.push(mount);
        self.focused = Some(panel_id.to_string());

        let last = self.mounts.len() - 1;
        &mut self.mounts[last]
    }

    /// Adjust the mount bound; excess mounts are evicted immediately,
    /// least-recently-used first.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        while self.mounts.len() > self.limit {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn evict_lru(&mut self) -> bool {
        let lru = self
            .mounts
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.last_used)
            .map(|(i, _)| i);
        let Some(idx) = lru else { return false };
        let mut evicted = self.mounts.remove(idx);
        tracing::debug!(panel = %evicted.panel_id, "evicting least-recently-used mount");
        if self.focused.as_deref() == Some(evicted.panel_id.as_str()) {
            self.focused = None;
        }
        evicted.channel.close();
        true
    }

    /// Forward input bytes for a pane. Dropped unless the pane is focused,
    /// so duplicate delivery is impossible when a session is transiently
    /// mounted twice.
    pub fn forward_input(&mut self, panel_id: &str, bytes: &[u8]) {
        if self.focused.as_deref() != Some(panel_id) {
            tracing::trace!(panel = %panel_id, "input dropped: pane not focused");
            return;
        }
        if let Some(mount) = self.get_mut(panel_id) {
            mount.channel.send_input(bytes);
        }
    }

    /// Close and remove a mount. Timer cancellation and transport shutdown
    /// happen synchronously, before the panel id is released.
    pub fn remove(&mut self, panel_id: &str) {
        if let Some(idx) = self.mounts.iter().position(|m| m.panel_id == panel_id) {
            let mut mount = self.mounts.remove(idx);
            mount.channel.close();
        }
        if self.focused.as_deref() == Some(panel_id) {
            self.focused = None;
        }
    }

    /// Drop mounts whose panel id is no longer live.
    pub fn retain_live(&mut self, live: &HashSet<PanelId>) {
        let stale: Vec<PanelId> = self
            .mounts
            .iter()
            .filter(|m| !live.contains(&m.panel_id))
            .map(|m| m.panel_id.clone())
            .collect();
        for panel_id in stale {
            self.remove(&panel_id);
        }
    }

    /// Pump every mount's channel and feed output into its grid, dormant or
    /// not, so a reused mount is current the moment it is shown again.
    pub fn pump(&mut self, now: Instant) {
        for mount in &mut self.mounts {
            let chunks = mount.channel.poll(now);
            mount.process(&chunks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::transport::channel::{ChannelConfig, ChannelStatus, Connector, ConnectionChannel};
    use crate::transport::testing::FakeConnector;

    fn make_channel(fake: &Arc<FakeConnector>, session_id: &str) -> ConnectionChannel {
        ConnectionChannel::new(
            session_id.to_string(),
            format!("ws://localhost:7681/ws/terminal/{session_id}"),
            ChannelConfig {
                connect_timeout: Duration::from_secs(10),
                retry_backoff: Duration::from_secs(2),
            },
            fake.clone() as Arc<dyn Connector>,
        )
    }

    #[test]
    fn activating_one_slot_creates_exactly_one_channel() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("project:b", 80, 24, now, || make_channel(&fake, "sess-b"));

        assert_eq!(pool.len(), 1);
        assert_eq!(fake.connect_count(), 1);
        assert_eq!(pool.get("project:b").unwrap().session_id(), "sess-b");
    }

    #[test]
    fn switching_back_reuses_a_dormant_mount() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("project:b", 80, 24, now, || make_channel(&fake, "sess-b"));
        pool.activate("project:c", 80, 24, now, || make_channel(&fake, "sess-c"));
        pool.activate("project:b", 80, 24, now, || {
            panic!("mount should be reused, not recreated")
        });

        assert_eq!(pool.len(), 2);
        assert_eq!(fake.connect_count(), 2);
    }

    #[test]
    fn lru_eviction_beyond_bound_never_evicts_new_mount() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        pool.activate("b", 80, 24, now, || make_channel(&fake, "sb"));
        pool.activate("c", 80, 24, now, || make_channel(&fake, "sc"));
        pool.activate("d", 80, 24, now, || make_channel(&fake, "sd"));

        let mut mounted = pool.mounted_ids();
        mounted.sort();
        assert_eq!(mounted, vec!["b", "c", "d"]);
    }

    #[test]
    fn reactivation_refreshes_lru_position() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        pool.activate("b", 80, 24, now, || make_channel(&fake, "sb"));
        pool.activate("c", 80, 24, now, || make_channel(&fake, "sc"));
        // Touch "a" so "b" becomes the LRU.
        pool.activate("a", 80, 24, now, || unreachable!());
        pool.activate("d", 80, 24, now, || make_channel(&fake, "sd"));

        let mut mounted = pool.mounted_ids();
        mounted.sort();
        assert_eq!(mounted, vec!["a", "c", "d"]);
    }

    #[test]
    fn only_the_focused_mount_forwards_input() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        pool.activate("b", 80, 24, now, || make_channel(&fake, "sb"));
        fake.open();
        pool.pump(now);

        // "b" was activated last and holds focus.
        pool.forward_input("a", b"nope");
        assert!(fake.sent().iter().all(|m| !matches!(
            m,
            crate::transport::channel::WireMessage::Input(_)
        )));

        pool.forward_input("b", b"yes");
        assert!(fake
            .sent()
            .iter()
            .any(|m| *m == crate::transport::channel::WireMessage::Input(b"yes".to_vec())));
    }

    #[test]
    fn dormant_mount_output_survives_reactivation() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        fake.open();
        pool.pump(now);

        // "a" goes dormant behind "b" but its session keeps talking.
        pool.activate("b", 80, 24, now, || make_channel(&fake, "sb"));
        fake.open();
        fake.deliver_attempt(0, b"while-hidden");
        pool.pump(now);

        // Switching back reuses the dormant mount with a current grid.
        pool.activate("a", 80, 24, now, || {
            panic!("mount should be reused, not recreated")
        });
        assert!(pool
            .get("a")
            .unwrap()
            .screen()
            .contents()
            .contains("while-hidden"));
    }

    #[test]
    fn remove_closes_the_channel_synchronously() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        fake.open();
        pool.pump(now);
        assert_eq!(
            pool.get("a").unwrap().channel.status(),
            ChannelStatus::Connected
        );

        pool.remove("a");
        assert!(pool.is_empty());
        assert_eq!(fake.shutdowns(), 1);
        assert_eq!(pool.focused(), None);
    }

    #[test]
    fn retain_live_drops_vanished_slots() {
        let fake = FakeConnector::new();
        let mut pool = MountPool::new();
        let now = Instant::now();

        pool.activate("a", 80, 24, now, || make_channel(&fake, "sa"));
        pool.activate("b", 80, 24, now, || make_channel(&fake, "sb"));

        pool.retain_live(&HashSet::from(["b".to_string()]));
        assert_eq!(pool.mounted_ids(), vec!["b"]);
    }
}
