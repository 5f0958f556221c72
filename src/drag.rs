//! Node drag engine.
//!
//! A press on a node arms the engine; movement past a small screen-space
//! threshold starts the drag, and anything under the threshold is reported
//! as a click on release. Pointer input arrives in screen space and is
//! converted through the current viewport, so a 50px drag at zoom 2 moves
//! the node 25 flow units.

use crate::geometry::{clamp, Point, Rect};
use crate::store::PositionStore;
use crate::viewport::{screen_to_flow, Viewport};
use ahash::AHashSet;

/// Engine-wide drag behavior knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct DragOptions {
    /// Snap dragged positions to this grid spacing (flow units). Snapping
    /// applies to the parent-relative position.
    pub snap_grid: Option<(f32, f32)>,
    /// Clamp dragged nodes to this absolute flow rect. A node's own
    /// `extent` takes precedence.
    pub node_extent: Option<Rect>,
    /// Screen-space distance the pointer must travel before a press becomes
    /// a drag; anything below is a click.
    pub drag_threshold: f32,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            snap_grid: None,
            node_extent: None,
            drag_threshold: 1.0,
        }
    }
}

/// One node's updated position, emitted on every drag step.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePositionChange {
    pub id: String,
    /// Parent-relative position (equals `position_absolute` for roots).
    pub position: Point,
    pub position_absolute: Point,
}

/// What a pointer release meant.
#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
    /// No press was armed.
    Ignored,
    /// Press and release without crossing the drag threshold.
    Click { node_id: String },
    /// A drag was in progress and has ended.
    DragStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragPhase {
    Idle,
    Pressed,
    Dragging,
}

impl Default for DragPhase {
    fn default() -> Self {
        DragPhase::Idle
    }
}

/// Captured state for one node in the drag set.
#[derive(Clone, Debug)]
struct DragItem {
    id: String,
    /// Node absolute position minus the pointer's flow position at press
    /// time; dragging keeps this offset constant.
    pointer_offset: Point,
    parent_absolute: Point,
    /// Effective clamp rect for this node, shrunk so the whole node stays
    /// inside.
    extent: Option<Rect>,
    origin_shift: Point,
}

/// Drives node dragging from raw pointer events.
///
/// The drag set is captured at press time: the pressed node, plus every
/// other selected draggable node when the pressed node is itself selected.
/// Descendants of captured nodes are excluded (they follow their parent
/// through re-resolution).
#[derive(Debug, Default)]
pub struct DragController {
    options: DragOptions,
    phase: DragPhase,
    pressed_id: Option<String>,
    down_screen: Point,
    items: Vec<DragItem>,
}

impl DragController {
    pub fn new(options: DragOptions) -> Self {
        Self {
            options,
            phase: DragPhase::Idle,
            pressed_id: None,
            down_screen: Point::ZERO,
            items: Vec::new(),
        }
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: DragOptions) {
        self.options = options;
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    pub fn is_active(&self) -> bool {
        self.phase != DragPhase::Idle
    }

    /// Arm a gesture on `node_id`. Returns false (and stays idle) when the
    /// node is missing, hidden, or neither draggable nor selectable.
    ///
    /// A selectable but non-draggable node arms click-only: moves never
    /// emit position changes, and a release under the threshold still
    /// reports a click so the press can select.
    pub fn on_pointer_down<T>(
        &mut self,
        screen: Point,
        node_id: &str,
        store: &PositionStore<T>,
        viewport: &Viewport,
    ) -> bool {
        let Some(pressed) = store.get(node_id) else {
            return false;
        };
        if pressed.node.hidden || (!pressed.node.draggable && !pressed.node.selectable) {
            return false;
        }
        if !pressed.node.draggable {
            self.items.clear();
            self.phase = DragPhase::Pressed;
            self.pressed_id = Some(node_id.to_string());
            self.down_screen = screen;
            return true;
        }

        let mut set: Vec<&str> = if pressed.node.selected {
            store
                .iter()
                .filter(|n| n.node.selected && n.node.draggable && !n.node.hidden)
                .map(|n| n.node.id.as_str())
                .collect()
        } else {
            vec![node_id]
        };
        if !set.iter().any(|id| *id == node_id) {
            set.push(node_id);
        }

        // Nodes whose ancestor is already in the set move with it.
        let mut covered: AHashSet<String> = AHashSet::new();
        for id in &set {
            for desc in store.descendants(id) {
                covered.insert(desc);
            }
        }
        set.retain(|id| !covered.contains(*id));

        let pointer_flow = screen_to_flow(screen, viewport);
        self.items = set
            .iter()
            .filter_map(|id| store.get(id))
            .map(|resolved| {
                let parent_absolute = resolved.position_absolute - resolved.node.position;
                let rect = resolved.rect();
                let origin_shift = resolved.position_absolute - rect.position();
                let extent = resolved
                    .node
                    .extent
                    .or(self.options.node_extent)
                    .map(|ext| shrink_extent(ext, rect.width, rect.height));
                DragItem {
                    id: resolved.node.id.clone(),
                    pointer_offset: resolved.position_absolute - pointer_flow,
                    parent_absolute,
                    extent,
                    origin_shift,
                }
            })
            .collect();

        self.phase = DragPhase::Pressed;
        self.pressed_id = Some(node_id.to_string());
        self.down_screen = screen;
        true
    }

    /// Advance the drag to a new pointer position. Returns the position
    /// changes to apply, empty while still under the click threshold.
    pub fn on_pointer_move(&mut self, screen: Point, viewport: &Viewport) -> Vec<NodePositionChange> {
        match self.phase {
            DragPhase::Idle => return Vec::new(),
            DragPhase::Pressed => {
                if screen.distance_to(self.down_screen) < self.options.drag_threshold {
                    return Vec::new();
                }
                self.phase = DragPhase::Dragging;
            }
            DragPhase::Dragging => {}
        }

        let pointer_flow = screen_to_flow(screen, viewport);
        let snap = self.options.snap_grid;
        self.items
            .iter()
            .map(|item| {
                let mut absolute = pointer_flow + item.pointer_offset;
                if let Some((gx, gy)) = snap {
                    let relative = (absolute - item.parent_absolute).snap_to_grid(gx, gy);
                    absolute = item.parent_absolute + relative;
                }
                if let Some(ext) = &item.extent {
                    // Clamp the rendered corner, then shift back.
                    let corner = absolute - item.origin_shift;
                    let clamped = Point::new(
                        clamp(corner.x, ext.x, ext.max_x()),
                        clamp(corner.y, ext.y, ext.max_y()),
                    );
                    absolute = clamped + item.origin_shift;
                }
                NodePositionChange {
                    id: item.id.clone(),
                    position: absolute - item.parent_absolute,
                    position_absolute: absolute,
                }
            })
            .collect()
    }

    /// End the gesture. Distinguishes a click from a completed drag.
    pub fn on_pointer_up(&mut self) -> DragOutcome {
        let outcome = match self.phase {
            DragPhase::Idle => DragOutcome::Ignored,
            DragPhase::Pressed => match self.pressed_id.take() {
                Some(node_id) => DragOutcome::Click { node_id },
                None => DragOutcome::Ignored,
            },
            DragPhase::Dragging => DragOutcome::DragStop,
        };
        self.reset();
        outcome
    }

    /// Abort the gesture. Nodes stay at their last emitted position;
    /// cancellation stops the drag, it does not undo it.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.pressed_id = None;
        self.items.clear();
    }
}

/// Shrink an extent by the node's size so clamping the top-left corner keeps
/// the whole node inside. A node larger than the extent pins to the extent's
/// origin corner.
fn shrink_extent(ext: Rect, width: f32, height: f32) -> Rect {
    Rect {
        x: ext.x,
        y: ext.y,
        width: (ext.width - width).max(0.0),
        height: (ext.height - height).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSink;
    use crate::node::Node;
    use crate::store::resolve_nodes;

    fn store_of(nodes: Vec<Node>) -> PositionStore {
        resolve_nodes(&nodes, &ErrorSink::silent())
    }

    fn node(id: &str, x: f32, y: f32) -> Node {
        Node::new(id, Point::new(x, y)).with_dimensions(100.0, 50.0)
    }

    // ========================================================================
    // Click vs drag threshold
    // ========================================================================

    #[test]
    fn test_release_under_threshold_is_click() {
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        assert!(drag.on_pointer_down(Point::new(10.0, 10.0), "a", &store, &vp));
        let changes = drag.on_pointer_move(Point::new(10.5, 10.0), &vp);
        assert!(changes.is_empty());
        assert_eq!(
            drag.on_pointer_up(),
            DragOutcome::Click { node_id: "a".into() }
        );
        assert!(!drag.is_active());
    }

    #[test]
    fn test_crossing_threshold_starts_drag() {
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(10.0, 10.0), "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(15.0, 10.0), &vp);
        assert_eq!(changes.len(), 1);
        assert!(drag.is_dragging());
        assert_eq!(drag.on_pointer_up(), DragOutcome::DragStop);
    }

    #[test]
    fn test_up_without_down_is_ignored() {
        let mut drag = DragController::new(DragOptions::default());
        assert_eq!(drag.on_pointer_up(), DragOutcome::Ignored);
    }

    // ========================================================================
    // Screen-to-flow delta conversion
    // ========================================================================

    #[test]
    fn test_screen_delta_divided_by_zoom() {
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::new(0.0, 0.0, 2.0);
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(100.0, 100.0), "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(150.0, 100.0), &vp);

        assert_eq!(changes[0].position, Point::new(25.0, 0.0));
        assert_eq!(changes[0].position_absolute, Point::new(25.0, 0.0));
    }

    #[test]
    fn test_drag_keeps_pointer_offset_constant() {
        let store = store_of(vec![node("a", 40.0, 40.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        // Press 10 units into the node.
        drag.on_pointer_down(Point::new(50.0, 50.0), "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(80.0, 65.0), &vp);
        assert_eq!(changes[0].position, Point::new(70.0, 55.0));
    }

    // ========================================================================
    // Non-draggable and missing nodes
    // ========================================================================

    #[test]
    fn test_non_draggable_node_arms_click_only() {
        let mut frozen = node("a", 0.0, 0.0);
        frozen.draggable = false;
        let store = store_of(vec![frozen]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        assert!(drag.on_pointer_down(Point::ZERO, "a", &store, &vp));
        // Movement past the threshold moves nothing.
        assert!(drag.on_pointer_move(Point::new(50.0, 0.0), &vp).is_empty());
        assert_eq!(drag.on_pointer_up(), DragOutcome::DragStop);
    }

    #[test]
    fn test_non_draggable_release_under_threshold_is_click() {
        let mut frozen = node("a", 0.0, 0.0);
        frozen.draggable = false;
        let store = store_of(vec![frozen]);
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::ZERO, "a", &store, &Viewport::default());
        assert_eq!(
            drag.on_pointer_up(),
            DragOutcome::Click { node_id: "a".into() }
        );
    }

    #[test]
    fn test_inert_node_rejects_press() {
        let mut inert = node("a", 0.0, 0.0);
        inert.draggable = false;
        inert.selectable = false;
        let store = store_of(vec![inert]);
        let mut drag = DragController::new(DragOptions::default());

        assert!(!drag.on_pointer_down(Point::ZERO, "a", &store, &Viewport::default()));
        assert!(!drag.is_active());
    }

    #[test]
    fn test_missing_node_rejects_press() {
        let store = store_of(vec![]);
        let mut drag = DragController::new(DragOptions::default());
        assert!(!drag.on_pointer_down(Point::ZERO, "ghost", &store, &Viewport::default()));
    }

    // ========================================================================
    // Multi-selection drag set
    // ========================================================================

    #[test]
    fn test_dragging_selected_node_moves_whole_selection() {
        let mut a = node("a", 0.0, 0.0);
        a.selected = true;
        let mut b = node("b", 200.0, 0.0);
        b.selected = true;
        let c = node("c", 400.0, 0.0);
        let store = store_of(vec![a, b, c]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(10.0, 10.0), "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(20.0, 10.0), &vp);

        let ids: Vec<&str> = changes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(changes[1].position, Point::new(210.0, 0.0));
    }

    #[test]
    fn test_dragging_unselected_node_moves_only_it() {
        let mut a = node("a", 0.0, 0.0);
        a.selected = true;
        let b = node("b", 200.0, 0.0);
        let store = store_of(vec![a, b]);
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::ZERO, "b", &store, &Viewport::default());
        let changes = drag.on_pointer_move(Point::new(10.0, 0.0), &Viewport::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "b");
    }

    #[test]
    fn test_selected_descendant_moves_with_parent_not_twice() {
        let mut parent = node("group", 100.0, 100.0);
        parent.selected = true;
        let mut child = node("child", 10.0, 10.0).with_parent("group");
        child.selected = true;
        let store = store_of(vec![parent, child]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(110.0, 110.0), "group", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(130.0, 110.0), &vp);

        // Only the parent appears; the child follows through re-resolution.
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "group");
        assert_eq!(changes[0].position, Point::new(120.0, 100.0));
    }

    #[test]
    fn test_child_drag_emits_parent_relative_position() {
        let parent = node("group", 100.0, 100.0);
        let child = node("child", 10.0, 10.0).with_parent("group");
        let store = store_of(vec![parent, child]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(110.0, 110.0), "child", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(115.0, 110.0), &vp);

        assert_eq!(changes[0].position, Point::new(15.0, 10.0));
        assert_eq!(changes[0].position_absolute, Point::new(115.0, 110.0));
    }

    // ========================================================================
    // Snapping and extents
    // ========================================================================

    #[test]
    fn test_snap_grid_rounds_relative_position() {
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions {
            snap_grid: Some((10.0, 10.0)),
            ..DragOptions::default()
        });

        drag.on_pointer_down(Point::ZERO, "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(13.0, 17.0), &vp);
        assert_eq!(changes[0].position, Point::new(10.0, 20.0));
    }

    #[test]
    fn test_node_extent_clamps_position() {
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions {
            node_extent: Some(Rect::new(0.0, 0.0, 500.0, 500.0)),
            ..DragOptions::default()
        });

        drag.on_pointer_down(Point::ZERO, "a", &store, &vp);
        // Node is 100x50; top-left clamps to 500-100=400, 500-50=450.
        let changes = drag.on_pointer_move(Point::new(1000.0, 1000.0), &vp);
        assert_eq!(changes[0].position, Point::new(400.0, 450.0));
    }

    #[test]
    fn test_oversized_node_pins_to_extent_origin() {
        // 100x50 node against a 50x20 extent: the shrunk extent collapses
        // to a point at the extent's origin.
        let store = store_of(vec![node("a", 0.0, 0.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions {
            node_extent: Some(Rect::new(10.0, 10.0, 50.0, 20.0)),
            ..DragOptions::default()
        });

        drag.on_pointer_down(Point::ZERO, "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(1000.0, 1000.0), &vp);
        assert_eq!(changes[0].position, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_per_node_extent_overrides_global() {
        let constrained =
            node("a", 0.0, 0.0).with_extent(Rect::new(0.0, 0.0, 200.0, 200.0));
        let store = store_of(vec![constrained]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions {
            node_extent: Some(Rect::new(0.0, 0.0, 5000.0, 5000.0)),
            ..DragOptions::default()
        });

        drag.on_pointer_down(Point::ZERO, "a", &store, &vp);
        let changes = drag.on_pointer_move(Point::new(1000.0, 0.0), &vp);
        assert_eq!(changes[0].position.x, 100.0);
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    #[test]
    fn test_cancel_stops_without_undoing() {
        let store = store_of(vec![node("a", 30.0, 40.0)]);
        let vp = Viewport::default();
        let mut drag = DragController::new(DragOptions::default());

        drag.on_pointer_down(Point::new(35.0, 45.0), "a", &store, &vp);
        drag.on_pointer_move(Point::new(100.0, 100.0), &vp);

        drag.cancel();
        assert!(!drag.is_active());
        // Further moves emit nothing; the last emitted position stands.
        assert!(drag.on_pointer_move(Point::new(200.0, 200.0), &vp).is_empty());
        assert_eq!(drag.on_pointer_up(), DragOutcome::Ignored);
    }
}
