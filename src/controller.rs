//! The engine facade: owns the model, the viewport, and all gesture
//! engines, and routes pointer input between them.
//!
//! Exactly one gesture is active at a time. A press decides which engine
//! owns the pointer (node press: drag, handle press: connection, canvas
//! press: pan or marquee), moves are coalesced and applied once per frame,
//! and release or cancellation returns the controller to idle.

use crate::connection::{
    Connection, ConnectionController, ConnectionOptions, ConnectionState, ConnectionValidator,
};
use crate::drag::{DragController, DragOptions, DragOutcome};
use crate::error::ErrorSink;
use crate::geometry::{Point, Rect};
use crate::node::{Edge, Node};
use crate::pan_zoom::{PanZoomController, PanZoomOptions};
use crate::selection::{SelectionController, SelectionManager, SelectionMode, SelectionOutcome};
use crate::store::{resolve_edges, resolve_nodes, HandleRef, PositionStore, ResolvedEdge};
use crate::viewport::{
    screen_to_flow, FitViewOptions, Viewport, ViewportController, ViewportOptions,
};
use std::rc::Rc;

/// What the pointer went down on. Hit testing against rendered elements is
/// the embedder's job; the engine takes the verdict.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerTarget {
    Node(String),
    Handle(HandleRef),
    Canvas,
}

/// Modifier keys that change how a press is routed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputModifiers {
    /// Additive-selection modifier (shift). On a node press it makes the
    /// click toggle; on a canvas press it forces the marquee over panning.
    pub selection: bool,
}

/// Notifications emitted as gestures mutate the model.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowEvent {
    NodesChanged,
    EdgesChanged,
    SelectionChanged,
    ConnectionChanged,
    ViewportChanged,
    /// A connection gesture committed. The edge has already been added.
    Connected(Connection),
}

/// Collapses a burst of pointer-move events into at most one position per
/// frame; [`take`](Self::take) drains the latest.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveCoalescer {
    pending: Option<Point>,
}

impl MoveCoalescer {
    pub fn queue(&mut self, screen: Point) {
        self.pending = Some(screen);
    }

    pub fn take(&mut self) -> Option<Point> {
        self.pending.take()
    }
}

/// Engine-wide configuration, split per concern.
#[derive(Clone, Debug, Default)]
pub struct FlowConfig {
    pub viewport: ViewportOptions,
    pub drag: DragOptions,
    pub connection: ConnectionOptions,
    pub pan_zoom: PanZoomOptions,
    pub selection_mode: SelectionMode,
    /// Append an engine-generated edge when a connection commits. Off by
    /// default: the consumer listens for [`FlowEvent::Connected`] and adds
    /// the edge itself, with an id of its choosing.
    pub connect_adds_edge: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActiveGesture {
    None,
    Drag { additive: bool },
    Connect,
    Pan,
    Marquee,
}

/// The top-level engine object an embedder drives.
///
/// The type parameter is the consumer payload carried by nodes.
pub struct FlowController<T = ()> {
    nodes: Vec<Node<T>>,
    edges: Vec<Edge>,
    store: PositionStore<T>,
    resolved_edges: Vec<ResolvedEdge>,

    viewport: ViewportController,
    drag: DragController,
    connection: ConnectionController<Box<dyn ConnectionValidator>>,
    selection: SelectionManager,
    marquee: SelectionController,
    pan_zoom: PanZoomController,

    errors: ErrorSink,
    coalescer: MoveCoalescer,
    active: ActiveGesture,
    pan_moved: bool,
    connect_adds_edge: bool,
    next_edge_seq: u64,
    listeners: Vec<Rc<dyn Fn(&FlowEvent)>>,
}

impl<T: Clone> FlowController<T> {
    pub fn new(config: FlowConfig, errors: ErrorSink) -> Self {
        // The canvas click-vs-marquee test uses the same screen-space
        // threshold as the node click-vs-drag test.
        let click_threshold = config.drag.drag_threshold;
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            store: PositionStore::default(),
            resolved_edges: Vec::new(),
            viewport: ViewportController::new(Viewport::default(), config.viewport),
            drag: DragController::new(config.drag),
            connection: ConnectionController::with_validator(
                config.connection,
                Box::new(crate::connection::AlwaysValid) as Box<dyn ConnectionValidator>,
                errors.clone(),
            ),
            selection: SelectionManager::new(),
            marquee: SelectionController::new(config.selection_mode, click_threshold),
            pan_zoom: PanZoomController::new(config.pan_zoom),
            errors,
            coalescer: MoveCoalescer::default(),
            active: ActiveGesture::None,
            pan_moved: false,
            connect_adds_edge: config.connect_adds_edge,
            next_edge_seq: 0,
            listeners: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Model
    // ------------------------------------------------------------------

    pub fn set_nodes(&mut self, nodes: Vec<Node<T>>) {
        self.nodes = nodes;
        self.resolve();
        self.emit(&FlowEvent::NodesChanged);
    }

    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.resolve_edges_only();
        self.emit(&FlowEvent::EdgesChanged);
    }

    /// Append one edge to the model, the usual consumer response to
    /// [`FlowEvent::Connected`].
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
        self.resolve_edges_only();
        self.emit(&FlowEvent::EdgesChanged);
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn store(&self) -> &PositionStore<T> {
        &self.store
    }

    pub fn resolved_edges(&self) -> &[ResolvedEdge] {
        &self.resolved_edges
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    pub fn marquee_rect(&self) -> Option<Rect> {
        self.marquee.marquee_rect()
    }

    /// Replace the connection validator.
    pub fn set_validator(&mut self, validator: impl ConnectionValidator + 'static) {
        self.connection = ConnectionController::with_validator(
            self.connection.options().clone(),
            Box::new(validator) as Box<dyn ConnectionValidator>,
            self.errors.clone(),
        );
    }

    pub fn on_event(&mut self, listener: impl Fn(&FlowEvent) + 'static) {
        self.listeners.push(Rc::new(listener));
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport
            .set_viewport_size(crate::geometry::Size::new(width, height));
        self.emit(&FlowEvent::ViewportChanged);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport.set_viewport(viewport);
        self.emit(&FlowEvent::ViewportChanged);
    }

    /// Frame all visible nodes. No-op when the graph or viewport is empty.
    pub fn fit_view(&mut self, opts: FitViewOptions) -> bool {
        let Some(bounds) = self.store.node_bounds() else {
            return false;
        };
        let fitted = self.viewport.fit_view(bounds, opts);
        if fitted {
            self.emit(&FlowEvent::ViewportChanged);
        }
        fitted
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Route a press to a gesture engine. Returns true when a gesture
    /// started.
    pub fn pointer_down(
        &mut self,
        screen: Point,
        target: PointerTarget,
        modifiers: InputModifiers,
    ) -> bool {
        self.coalescer = MoveCoalescer::default();
        match target {
            PointerTarget::Node(id) => {
                if self
                    .drag
                    .on_pointer_down(screen, &id, &self.store, &self.viewport.viewport())
                {
                    tracing::trace!(node = %id, "drag gesture started");
                    self.active = ActiveGesture::Drag {
                        additive: modifiers.selection,
                    };
                    true
                } else {
                    false
                }
            }
            PointerTarget::Handle(handle) => {
                if self.connection.start(handle, &self.store) {
                    tracing::trace!("connection gesture started");
                    self.active = ActiveGesture::Connect;
                    self.emit(&FlowEvent::ConnectionChanged);
                    true
                } else {
                    false
                }
            }
            PointerTarget::Canvas => {
                if !modifiers.selection && self.pan_zoom.begin_pan(screen) {
                    tracing::trace!("pan gesture started");
                    self.active = ActiveGesture::Pan;
                    self.pan_moved = false;
                } else {
                    let flow = screen_to_flow(screen, &self.viewport.viewport());
                    self.marquee.start(flow, screen);
                    tracing::trace!("marquee gesture started");
                    self.active = ActiveGesture::Marquee;
                }
                true
            }
        }
    }

    /// Record a pointer move. Applied on the next [`frame`](Self::frame).
    pub fn pointer_moved(&mut self, screen: Point) {
        self.coalescer.queue(screen);
    }

    /// Apply the latest coalesced pointer position to the active gesture.
    /// Call once per rendered frame.
    pub fn frame(&mut self) {
        let Some(screen) = self.coalescer.take() else {
            return;
        };
        match self.active {
            ActiveGesture::None => {}
            ActiveGesture::Drag { .. } => {
                let changes = self
                    .drag
                    .on_pointer_move(screen, &self.viewport.viewport());
                if !changes.is_empty() {
                    self.apply_position_changes(&changes);
                    self.emit(&FlowEvent::NodesChanged);
                }
            }
            ActiveGesture::Connect => {
                let vp = self.viewport.viewport();
                let flow = screen_to_flow(screen, &vp);
                self.connection.update(flow, vp.zoom, &self.store);
                self.emit(&FlowEvent::ConnectionChanged);
            }
            ActiveGesture::Pan => {
                if self.pan_zoom.on_pointer_move(screen, &mut self.viewport) {
                    self.pan_moved = true;
                    self.emit(&FlowEvent::ViewportChanged);
                }
            }
            ActiveGesture::Marquee => {
                let flow = screen_to_flow(screen, &self.viewport.viewport());
                let change =
                    self.marquee
                        .update(flow, screen, &self.store, &self.resolved_edges);
                if let Some(change) = change {
                    self.selection
                        .replace(change.selected_node_ids, change.selected_edge_ids);
                    self.sync_selection_flags();
                    self.emit(&FlowEvent::SelectionChanged);
                }
            }
        }
    }

    /// Finish the active gesture.
    pub fn pointer_up(&mut self) {
        // Apply any move queued in the same frame as the release.
        self.frame();
        match self.active {
            ActiveGesture::None => {}
            ActiveGesture::Drag { additive } => match self.drag.on_pointer_up() {
                DragOutcome::Click { node_id } => {
                    let selectable = self
                        .store
                        .get(&node_id)
                        .map_or(false, |n| n.node.selectable);
                    if selectable && self.selection.handle_node_click(&node_id, additive) {
                        self.sync_selection_flags();
                        self.emit(&FlowEvent::SelectionChanged);
                    }
                }
                DragOutcome::DragStop | DragOutcome::Ignored => {}
            },
            ActiveGesture::Connect => {
                if let Some(connection) = self.connection.end() {
                    if self.connect_adds_edge {
                        let edge = self.edge_from(&connection);
                        self.add_edge(edge);
                    }
                    self.emit(&FlowEvent::Connected(connection));
                }
                self.emit(&FlowEvent::ConnectionChanged);
            }
            ActiveGesture::Pan => {
                self.pan_zoom.end_pan();
                // A press-and-release that never panned is a canvas click.
                if !self.pan_moved && self.selection.clear() {
                    self.sync_selection_flags();
                    self.emit(&FlowEvent::SelectionChanged);
                }
            }
            ActiveGesture::Marquee => {
                if self.marquee.end() == Some(SelectionOutcome::ClearedByClick)
                    && self.selection.clear()
                {
                    self.sync_selection_flags();
                    self.emit(&FlowEvent::SelectionChanged);
                }
            }
        }
        if self.active != ActiveGesture::None {
            tracing::trace!("gesture finished");
        }
        self.active = ActiveGesture::None;
    }

    /// Abort whatever gesture is in progress (Escape or pointer leaving the
    /// surface). Dragged nodes stay at their last applied position; an
    /// in-progress connection vanishes without connecting.
    pub fn cancel_active(&mut self) {
        if self.active != ActiveGesture::None {
            tracing::trace!("gesture cancelled");
        }
        match self.active {
            ActiveGesture::None => {}
            ActiveGesture::Drag { .. } => self.drag.cancel(),
            ActiveGesture::Connect => {
                self.connection.cancel();
                self.emit(&FlowEvent::ConnectionChanged);
            }
            ActiveGesture::Pan => self.pan_zoom.cancel(),
            ActiveGesture::Marquee => self.marquee.cancel(),
        }
        self.active = ActiveGesture::None;
        self.coalescer = MoveCoalescer::default();
    }

    // ------------------------------------------------------------------
    // Gesture input that bypasses the press/move/release cycle
    // ------------------------------------------------------------------

    pub fn wheel(&mut self, delta: Point, pointer_screen: Point, zoom_modifier: bool) {
        self.pan_zoom
            .on_wheel(delta, pointer_screen, zoom_modifier, &mut self.viewport);
        self.emit(&FlowEvent::ViewportChanged);
    }

    pub fn pinch(&mut self, scale: f32, pointer_screen: Point) {
        self.pan_zoom
            .on_pinch(scale, pointer_screen, &mut self.viewport);
        self.emit(&FlowEvent::ViewportChanged);
    }

    pub fn double_click(&mut self, pointer_screen: Point) {
        self.pan_zoom
            .on_double_click(pointer_screen, &mut self.viewport);
        self.emit(&FlowEvent::ViewportChanged);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn resolve(&mut self) {
        self.store = resolve_nodes(&self.nodes, &self.errors);
        self.resolved_edges = resolve_edges(&self.edges, &self.store, &self.errors);
    }

    fn resolve_edges_only(&mut self) {
        self.resolved_edges = resolve_edges(&self.edges, &self.store, &self.errors);
    }

    fn apply_position_changes(&mut self, changes: &[crate::drag::NodePositionChange]) {
        for change in changes {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == change.id) {
                node.position = change.position;
            }
        }
        self.resolve();
    }

    /// Push the selection sets back onto the node/edge flags and
    /// re-resolve, so selected nodes pick up their z elevation.
    fn sync_selection_flags(&mut self) {
        for node in &mut self.nodes {
            node.selected = self.selection.is_node_selected(&node.id);
        }
        for edge in &mut self.edges {
            edge.selected = self.selection.is_edge_selected(&edge.id);
        }
        self.resolve();
    }

    fn edge_from(&mut self, connection: &Connection) -> Edge {
        self.next_edge_seq += 1;
        let mut edge = Edge::new(
            format!(
                "edge-{}-{}-{}",
                self.next_edge_seq, connection.source, connection.target
            ),
            connection.source.clone(),
            connection.target.clone(),
        );
        edge.source_handle = connection.source_handle.clone();
        edge.target_handle = connection.target_handle.clone();
        edge
    }

    fn emit(&self, event: &FlowEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}
