//! Debounced persistence of layout geometry.
//!
//! Resize commits queue records here; the saver flushes them to the external
//! sink at most once per debounce window, retrying a bounded number of times
//! on failure. Transient save failures are logged and never surfaced to the
//! user; the in-memory geometry stays authoritative.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::config::PersistenceConfig;
use crate::slots::PanelId;

/// One pane's persisted geometry, as handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaneGeometryRecord {
    pub pane_id: PanelId,
    pub width_percent: f64,
    pub height_percent: f64,
}

/// External collaborator that stores layout geometry.
pub trait LayoutSink {
    /// Persist the given records. Errors are retried by the saver.
    fn save(&mut self, records: &[PaneGeometryRecord]) -> Result<()>;
}

/// Coalesces geometry records and flushes them on a debounce deadline.
///
/// Tick-driven: the owner calls `tick` from its event loop with the current
/// instant; no timer threads are involved.
#[derive(Debug)]
pub struct DebouncedLayoutSaver {
    debounce: Duration,
    max_retries: u32,
    pending: Option<Vec<PaneGeometryRecord>>,
    deadline: Option<Instant>,
}

impl DebouncedLayoutSaver {
    /// Create a saver from the persistence configuration.
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            max_retries: config.max_retries,
            pending: None,
            deadline: None,
        }
    }

    /// Queue records for the next flush, replacing any not-yet-flushed ones.
    ///
    /// The first queue in a window arms the deadline; later queues within the
    /// window only refresh the payload, so the sink is called at most once
    /// per window.
    pub fn queue(&mut self, records: Vec<PaneGeometryRecord>, now: Instant) {
        if records.is_empty() {
            return;
        }
        self.pending = Some(records);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.debounce);
        }
    }

    /// Whether a flush is pending.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Flush the pending records if the debounce deadline has passed.
    ///
    /// Returns `true` if a save attempt (successful or not) was made.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn LayoutSink) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return false,
        }
        self.deadline = None;

        let Some(records) = self.pending.take() else {
            return false;
        };
        self.flush(&records, sink);
        true
    }

    /// Flush any pending records immediately, ignoring the deadline.
    /// Used on teardown so a final resize isn't lost.
    pub fn flush_now(&mut self, sink: &mut dyn LayoutSink) {
        self.deadline = None;
        if let Some(records) = self.pending.take() {
            self.flush(&records, sink);
        }
    }

    fn flush(&self, records: &[PaneGeometryRecord], sink: &mut dyn LayoutSink) {
        let mut attempts = 0;
        loop {
            match sink.save(records) {
                Ok(()) => {
                    tracing::debug!(panes = records.len(), "layout geometry saved");
                    return;
                }
                Err(err) if attempts < self.max_retries => {
                    attempts += 1;
                    tracing::debug!(%err, attempts, "layout save failed, retrying");
                }
                Err(err) => {
                    // UI continues with in-memory state.
                    tracing::warn!(%err, "layout save failed after retries, keeping in-memory state");
                    return;
                }
            }
        }
    }
}
