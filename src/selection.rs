//! Selection: click semantics and the marquee rectangle.
//!
//! [`SelectionManager`] owns the selected-id sets and implements the click
//! rules (plain click replaces, shift-click toggles). [`SelectionController`]
//! drives the canvas marquee gesture, recomputing the covered set on every
//! pointer move so selection feedback is live.

use crate::geometry::{Point, Rect};
use crate::store::{PositionStore, ResolvedEdge};
use ahash::AHashSet;

/// Holds the selected node and edge ids and applies click semantics.
#[derive(Clone, Debug, Default)]
pub struct SelectionManager {
    nodes: AHashSet<String>,
    edges: AHashSet<String>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_node_selected(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn is_edge_selected(&self, id: &str) -> bool {
        self.edges.contains(id)
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn selected_edges(&self) -> impl Iterator<Item = &str> {
        self.edges.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Click on a node. Without the modifier the click replaces the whole
    /// selection; with it, the node toggles. Returns true when anything
    /// changed.
    pub fn handle_node_click(&mut self, id: &str, additive: bool) -> bool {
        if additive {
            if !self.nodes.remove(id) {
                self.nodes.insert(id.to_string());
            }
            true
        } else if self.nodes.len() == 1 && self.nodes.contains(id) && self.edges.is_empty() {
            false
        } else {
            self.nodes.clear();
            self.edges.clear();
            self.nodes.insert(id.to_string());
            true
        }
    }

    /// Click on an edge, same semantics as [`handle_node_click`](Self::handle_node_click).
    pub fn handle_edge_click(&mut self, id: &str, additive: bool) -> bool {
        if additive {
            if !self.edges.remove(id) {
                self.edges.insert(id.to_string());
            }
            true
        } else if self.edges.len() == 1 && self.edges.contains(id) && self.nodes.is_empty() {
            false
        } else {
            self.nodes.clear();
            self.edges.clear();
            self.edges.insert(id.to_string());
            true
        }
    }

    /// Replace the whole selection, as the marquee does on every update.
    pub fn replace(
        &mut self,
        node_ids: impl IntoIterator<Item = String>,
        edge_ids: impl IntoIterator<Item = String>,
    ) {
        self.nodes = node_ids.into_iter().collect();
        self.edges = edge_ids.into_iter().collect();
    }

    /// Returns true when anything was selected.
    pub fn clear(&mut self) -> bool {
        let had = !self.is_empty();
        self.nodes.clear();
        self.edges.clear();
        had
    }
}

/// Inclusion rule for elements under the marquee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only elements fully contained in the marquee are selected.
    #[default]
    Full,
    /// Any overlap with the marquee selects the element.
    Partial,
}

/// Ids covered by the marquee at its current extent, in store order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionChange {
    pub selected_node_ids: Vec<String>,
    pub selected_edge_ids: Vec<String>,
}

/// How a marquee gesture ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The marquee grew past the click threshold; its last
    /// [`SelectionChange`] stands.
    Committed,
    /// The pointer never left the click threshold: a plain canvas click,
    /// which clears the selection.
    ClearedByClick,
}

#[derive(Clone, Debug)]
struct Marquee {
    start_flow: Point,
    current_flow: Point,
    start_screen: Point,
    moved: bool,
}

/// Drives the canvas marquee.
///
/// Flow-space and screen-space pointer positions travel together: the
/// marquee itself lives in flow space, while the click-vs-drag threshold is
/// measured in screen pixels so it is zoom-independent.
#[derive(Clone, Debug)]
pub struct SelectionController {
    mode: SelectionMode,
    /// Screen-space distance below which the gesture counts as a click.
    /// Shared with the node drag threshold so node and canvas presses
    /// disambiguate the same way.
    click_threshold: f32,
    active: Option<Marquee>,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(SelectionMode::Full, 1.0)
    }
}

impl SelectionController {
    pub fn new(mode: SelectionMode, click_threshold: f32) -> Self {
        Self {
            mode,
            click_threshold,
            active: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current marquee rectangle in flow space, for rendering. `None` until
    /// the pointer crosses the click threshold.
    pub fn marquee_rect(&self) -> Option<Rect> {
        self.active
            .as_ref()
            .filter(|m| m.moved)
            .map(|m| Rect::from_points(m.start_flow, m.current_flow))
    }

    pub fn start(&mut self, flow: Point, screen: Point) {
        self.active = Some(Marquee {
            start_flow: flow,
            current_flow: flow,
            start_screen: screen,
            moved: false,
        });
    }

    /// Grow the marquee and recompute the covered set. Returns `None` while
    /// the gesture is still within the click threshold (or not active).
    pub fn update<T>(
        &mut self,
        flow: Point,
        screen: Point,
        store: &PositionStore<T>,
        edges: &[ResolvedEdge],
    ) -> Option<SelectionChange> {
        let mode = self.mode;
        let marquee = self.active.as_mut()?;
        marquee.current_flow = flow;
        if !marquee.moved {
            if screen.distance_to(marquee.start_screen) < self.click_threshold {
                return None;
            }
            marquee.moved = true;
        }

        let rect = Rect::from_points(marquee.start_flow, marquee.current_flow);
        Some(covered_by(&rect, mode, store, edges))
    }

    /// End the gesture, distinguishing a committed marquee from a plain
    /// canvas click.
    pub fn end(&mut self) -> Option<SelectionOutcome> {
        self.active.take().map(|m| {
            if m.moved {
                SelectionOutcome::Committed
            } else {
                SelectionOutcome::ClearedByClick
            }
        })
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }
}

/// The covered set under a marquee rect, honoring per-element visibility
/// and selectability.
fn covered_by<T>(
    rect: &Rect,
    mode: SelectionMode,
    store: &PositionStore<T>,
    edges: &[ResolvedEdge],
) -> SelectionChange {
    let selected_node_ids = store
        .iter()
        .filter(|n| n.node.selectable && !n.node.hidden)
        .filter(|n| {
            let node_rect = n.rect();
            match mode {
                SelectionMode::Full => rect.contains_rect(&node_rect),
                SelectionMode::Partial => rect.intersects(&node_rect),
            }
        })
        .map(|n| n.node.id.clone())
        .collect();

    // Edge boxes collapse to a line for axis-aligned edges, so overlap uses
    // the closed-range test.
    let selected_edge_ids = edges
        .iter()
        .filter(|e| {
            let bounds = e.bounds();
            match mode {
                SelectionMode::Full => rect.contains_rect(&bounds),
                SelectionMode::Partial => rect.intersects_inclusive(&bounds),
            }
        })
        .map(|e| e.edge.id.clone())
        .collect();

    SelectionChange {
        selected_node_ids,
        selected_edge_ids,
    }
}
