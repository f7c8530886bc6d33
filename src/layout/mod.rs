//! Layout engine: maps the ordered slot list plus a layout mode to a
//! concrete arrangement of visible panes.
//!
//! Geometry percentages are user-adjustable and persisted keyed by panel id
//! (not session id), so a stored layout survives session restarts. Ordered
//! slots beyond a mode's capacity stay in the ordering but are not rendered.

pub mod persist;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::slots::PanelId;
use persist::PaneGeometryRecord;

/// How visible panes are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Exactly one visible slot, full geometry.
    #[default]
    Single,
    /// All slots side by side along the horizontal axis.
    HorizontalSplit,
    /// All slots stacked along the vertical axis.
    VerticalSplit,
    Grid2x2,
    Grid3x3,
    Grid4x4,
}

impl LayoutMode {
    /// Fixed capacity of the mode; `None` for the split modes, which are
    /// unbounded beyond practical screen limits.
    pub fn max_visible(&self) -> Option<usize> {
        match self {
            LayoutMode::Single => Some(1),
            LayoutMode::HorizontalSplit | LayoutMode::VerticalSplit => None,
            LayoutMode::Grid2x2 => Some(4),
            LayoutMode::Grid3x3 => Some(9),
            LayoutMode::Grid4x4 => Some(16),
        }
    }

    /// Side length for grid modes.
    pub fn grid_dim(&self) -> Option<usize> {
        match self {
            LayoutMode::Grid2x2 => Some(2),
            LayoutMode::Grid3x3 => Some(3),
            LayoutMode::Grid4x4 => Some(4),
            LayoutMode::Single | LayoutMode::HorizontalSplit | LayoutMode::VerticalSplit => None,
        }
    }
}

/// User-adjusted size for one pane, as percentages of the layout area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaneSize {
    pub width_pct: f64,
    pub height_pct: f64,
}

/// Persisted pane sizes, keyed by panel id.
pub type GeometryMap = HashMap<PanelId, PaneSize>;

/// Axis of a divider between two panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Divider separates panes left/right; equalizing splits width.
    Horizontal,
    /// Divider separates panes top/bottom; equalizing splits height.
    Vertical,
}

/// Placement of one visible pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PanePlacement {
    pub panel_id: PanelId,
    pub width_pct: f64,
    pub height_pct: f64,
    pub row: usize,
    pub col: usize,
}

/// The concrete geometry for one layout derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    pub mode: LayoutMode,
    /// Visible panes, in ordering order.
    pub visible: Vec<PanePlacement>,
    /// Ordered panel ids beyond the mode capacity; retained, not rendered.
    pub overflow: Vec<PanelId>,
    /// Grid cells beyond the live slot count; rendered as add-affordances.
    pub empty_cells: usize,
}

impl Arrangement {
    /// Panel ids of the visible panes, in order.
    pub fn visible_ids(&self) -> Vec<PanelId> {
        self.visible.iter().map(|p| p.panel_id.clone()).collect()
    }

    /// Placement for a panel id, if visible.
    pub fn placement(&self, panel_id: &str) -> Option<&PanePlacement> {
        self.visible.iter().find(|p| p.panel_id == panel_id)
    }
}

/// Derive the arrangement for an ordered slot list and a layout mode.
///
/// Persisted percentages override the equal-share defaults per panel id.
pub fn arrange(order: &[PanelId], mode: LayoutMode, saved: &GeometryMap) -> Arrangement {
    let capacity = mode.max_visible().unwrap_or(order.len());
    let shown = order.len().min(capacity);
    let overflow = order[shown..].to_vec();

    let visible: Vec<PanePlacement> = match mode {
        LayoutMode::Single => order
            .first()
            .map(|id| PanePlacement {
                panel_id: id.clone(),
                width_pct: 100.0,
                height_pct: 100.0,
                row: 0,
                col: 0,
            })
            .into_iter()
            .collect(),

        LayoutMode::HorizontalSplit => {
            let share = equal_share(shown);
            order[..shown]
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let size = saved.get(id);
                    PanePlacement {
                        panel_id: id.clone(),
                        width_pct: size.map_or(share, |s| s.width_pct),
                        height_pct: 100.0,
                        row: 0,
                        col: i,
                    }
                })
                .collect()
        }

        LayoutMode::VerticalSplit => {
            let share = equal_share(shown);
            order[..shown]
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let size = saved.get(id);
                    PanePlacement {
                        panel_id: id.clone(),
                        width_pct: 100.0,
                        height_pct: size.map_or(share, |s| s.height_pct),
                        row: i,
                        col: 0,
                    }
                })
                .collect()
        }

        LayoutMode::Grid2x2 | LayoutMode::Grid3x3 | LayoutMode::Grid4x4 => {
            let dim = mode.grid_dim().unwrap_or(1);
            let share = equal_share(dim);
            order[..shown]
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let size = saved.get(id);
                    PanePlacement {
                        panel_id: id.clone(),
                        width_pct: size.map_or(share, |s| s.width_pct),
                        height_pct: size.map_or(share, |s| s.height_pct),
                        row: i / dim,
                        col: i % dim,
                    }
                })
                .collect()
        }
    };

    let empty_cells = match mode.max_visible() {
        Some(cap) if mode.grid_dim().is_some() => cap.saturating_sub(shown),
        _ => 0,
    };

    Arrangement {
        mode,
        visible,
        overflow,
        empty_cells,
    }
}

fn equal_share(count: usize) -> f64 {
    if count == 0 {
        100.0
    } else {
        100.0 / count as f64
    }
}

/// Commit a finished drag-resize.
///
/// Recomputes the geometry map per panel id from the final sizes and returns
/// the records for the debounced persistence sink. Called once when the drag
/// ends, never per intermediate frame.
pub fn commit_resize(
    geometry: &mut GeometryMap,
    sizes: &[(PanelId, PaneSize)],
) -> Vec<PaneGeometryRecord> {
    let mut records = Vec::with_capacity(sizes.len());
    for (panel_id, size) in sizes {
        geometry.insert(panel_id.clone(), *size);
        records.push(PaneGeometryRecord {
            pane_id: panel_id.clone(),
            width_percent: size.width_pct,
            height_percent: size.height_pct,
        });
    }
    records
}

/// Double-click on a divider: reset the two adjacent regions to an equal
/// split of their combined current total along the divider's axis, computed
/// from the live arrangement rather than from defaults.
///
/// Returns the records to persist, or an empty vec if either pane is not
/// visible (stale ids are absorbed, never fatal).
pub fn equalize(
    geometry: &mut GeometryMap,
    arrangement: &Arrangement,
    a: &str,
    b: &str,
    axis: Axis,
) -> Vec<PaneGeometryRecord> {
    let (Some(pa), Some(pb)) = (arrangement.placement(a), arrangement.placement(b)) else {
        tracing::debug!(a, b, "equalize ignored: pane not visible");
        return Vec::new();
    };

    let (mut size_a, mut size_b) = (
        PaneSize {
            width_pct: pa.width_pct,
            height_pct: pa.height_pct,
        },
        PaneSize {
            width_pct: pb.width_pct,
            height_pct: pb.height_pct,
        },
    );

    match axis {
        Axis::Horizontal => {
            let half = (size_a.width_pct + size_b.width_pct) / 2.0;
            size_a.width_pct = half;
            size_b.width_pct = half;
        }
        Axis::Vertical => {
            let half = (size_a.height_pct + size_b.height_pct) / 2.0;
            size_a.height_pct = half;
            size_b.height_pct = half;
        }
    }

    commit_resize(
        geometry,
        &[(a.to_string(), size_a), (b.to_string(), size_b)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<PanelId> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_shows_exactly_one_full_pane() {
        let order = ids(&["a", "b", "c"]);
        let arr = arrange(&order, LayoutMode::Single, &GeometryMap::new());

        assert_eq!(arr.visible.len(), 1);
        assert_eq!(arr.visible[0].panel_id, "a");
        assert_eq!(arr.visible[0].width_pct, 100.0);
        assert_eq!(arr.visible[0].height_pct, 100.0);
        assert_eq!(arr.overflow, ids(&["b", "c"]));
    }

    #[test]
    fn horizontal_split_shares_width_equally() {
        let order = ids(&["a", "b", "c", "d"]);
        let arr = arrange(&order, LayoutMode::HorizontalSplit, &GeometryMap::new());

        assert_eq!(arr.visible.len(), 4);
        for (i, pane) in arr.visible.iter().enumerate() {
            assert_eq!(pane.width_pct, 25.0);
            assert_eq!(pane.height_pct, 100.0);
            assert_eq!(pane.col, i);
            assert_eq!(pane.row, 0);
        }
        assert!(arr.overflow.is_empty());
    }

    #[test]
    fn vertical_split_shares_height_equally() {
        let order = ids(&["a", "b"]);
        let arr = arrange(&order, LayoutMode::VerticalSplit, &GeometryMap::new());

        assert_eq!(arr.visible[0].height_pct, 50.0);
        assert_eq!(arr.visible[1].row, 1);
        assert_eq!(arr.visible[1].width_pct, 100.0);
    }

    #[test]
    fn saved_geometry_overrides_equal_share() {
        let order = ids(&["a", "b"]);
        let mut saved = GeometryMap::new();
        saved.insert(
            "a".to_string(),
            PaneSize {
                width_pct: 70.0,
                height_pct: 100.0,
            },
        );

        let arr = arrange(&order, LayoutMode::HorizontalSplit, &saved);
        assert_eq!(arr.visible[0].width_pct, 70.0);
        assert_eq!(arr.visible[1].width_pct, 50.0);
    }

    #[test]
    fn grid_2x2_with_five_slots_shows_first_four() {
        let order = ids(&["a", "b", "c", "d", "e"]);
        let arr = arrange(&order, LayoutMode::Grid2x2, &GeometryMap::new());

        assert_eq!(arr.visible_ids(), ids(&["a", "b", "c", "d"]));
        assert_eq!(arr.overflow, ids(&["e"]));
        assert_eq!(arr.empty_cells, 0);

        // Removing a visible slot promotes the fifth on re-derivation.
        let order = ids(&["a", "c", "d", "e"]);
        let arr = arrange(&order, LayoutMode::Grid2x2, &GeometryMap::new());
        assert_eq!(arr.visible_ids(), ids(&["a", "c", "d", "e"]));
        assert!(arr.overflow.is_empty());
    }

    #[test]
    fn grid_positions_follow_row_major_order() {
        let order = ids(&["a", "b", "c", "d"]);
        let arr = arrange(&order, LayoutMode::Grid2x2, &GeometryMap::new());

        assert_eq!((arr.visible[0].row, arr.visible[0].col), (0, 0));
        assert_eq!((arr.visible[1].row, arr.visible[1].col), (0, 1));
        assert_eq!((arr.visible[2].row, arr.visible[2].col), (1, 0));
        assert_eq!((arr.visible[3].row, arr.visible[3].col), (1, 1));
    }

    #[test]
    fn grid_empty_cells_are_add_affordances() {
        let order = ids(&["a", "b"]);
        let arr = arrange(&order, LayoutMode::Grid3x3, &GeometryMap::new());
        assert_eq!(arr.visible.len(), 2);
        assert_eq!(arr.empty_cells, 7);
    }

    #[test]
    fn commit_resize_updates_geometry_and_emits_records() {
        let mut geometry = GeometryMap::new();
        let records = commit_resize(
            &mut geometry,
            &[(
                "a".to_string(),
                PaneSize {
                    width_pct: 60.0,
                    height_pct: 100.0,
                },
            )],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pane_id, "a");
        assert_eq!(records[0].width_percent, 60.0);
        assert_eq!(geometry["a"].width_pct, 60.0);
    }

    #[test]
    fn equalize_splits_combined_total_from_live_sizes() {
        let order = ids(&["a", "b"]);
        let mut geometry = GeometryMap::new();
        geometry.insert(
            "a".to_string(),
            PaneSize {
                width_pct: 70.0,
                height_pct: 100.0,
            },
        );
        geometry.insert(
            "b".to_string(),
            PaneSize {
                width_pct: 30.0,
                height_pct: 100.0,
            },
        );

        let arr = arrange(&order, LayoutMode::HorizontalSplit, &geometry);
        let records = equalize(&mut geometry, &arr, "a", "b", Axis::Horizontal);

        assert_eq!(records.len(), 2);
        assert_eq!(geometry["a"].width_pct, 50.0);
        assert_eq!(geometry["b"].width_pct, 50.0);
    }

    #[test]
    fn equalize_with_hidden_pane_is_noop() {
        let order = ids(&["a"]);
        let mut geometry = GeometryMap::new();
        let arr = arrange(&order, LayoutMode::Single, &geometry);

        let records = equalize(&mut geometry, &arr, "a", "ghost", Axis::Horizontal);
        assert!(records.is_empty());
        assert!(geometry.is_empty());
    }
}
