//! Common test utilities for integration tests.

#![allow(dead_code)]

use flowgraph::{
    Edge, ErrorSink, FlowConfig, FlowController, FlowError, FlowEvent, HandleRef, HandleSpec,
    HandleType, InputModifiers, Node, Point, PointerTarget, Position,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Records every event and error the engine emits.
#[derive(Default, Clone)]
pub struct EventTracker {
    pub events: Rc<RefCell<Vec<FlowEvent>>>,
    pub errors: Rc<RefCell<Vec<FlowError>>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, wanted: &FlowEvent) -> usize {
        self.events.borrow().iter().filter(|e| *e == wanted).count()
    }

    pub fn connected(&self) -> Vec<flowgraph::Connection> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                FlowEvent::Connected(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }
}

/// A [`FlowController`] wired to an [`EventTracker`], with helpers for
/// simulating complete pointer gestures.
pub struct FlowHarness {
    pub flow: FlowController,
    pub tracker: EventTracker,
}

impl FlowHarness {
    /// Default harness configuration: engine-generated edges are enabled
    /// so connect gestures can be asserted against the model.
    pub fn new() -> Self {
        Self::with_config(FlowConfig {
            connect_adds_edge: true,
            ..FlowConfig::default()
        })
    }

    pub fn with_config(config: FlowConfig) -> Self {
        let tracker = EventTracker::new();
        let sink = {
            let errors = tracker.errors.clone();
            ErrorSink::new(move |e| errors.borrow_mut().push(e.clone()))
        };
        let mut flow = FlowController::new(config, sink);
        flow.set_viewport_size(800.0, 600.0);
        {
            let events = tracker.events.clone();
            flow.on_event(move |e| events.borrow_mut().push(e.clone()));
        }
        Self { flow, tracker }
    }

    pub fn with_nodes(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut harness = Self::new();
        harness.flow.set_nodes(nodes);
        harness.flow.set_edges(edges);
        harness.tracker.clear();
        harness
    }

    /// A 100x50 node with a target handle on the left and a source handle
    /// on the right, the shape most scenarios use.
    pub fn wired_node(id: &str, x: f32, y: f32) -> Node {
        Node::new(id, Point::new(x, y))
            .with_dimensions(100.0, 50.0)
            .with_handles(vec![
                HandleSpec::new(HandleType::Target, Position::Left).with_id("in"),
                HandleSpec::new(HandleType::Source, Position::Right).with_id("out"),
            ])
    }

    pub fn source_handle(node: &str) -> HandleRef {
        HandleRef {
            node_id: node.into(),
            handle_id: Some("out".into()),
            kind: HandleType::Source,
        }
    }

    pub fn node_position(&self, id: &str) -> Point {
        self.flow
            .nodes()
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.position)
            .unwrap_or_else(|| panic!("no node {id}"))
    }

    pub fn absolute_position(&self, id: &str) -> Point {
        self.flow
            .store()
            .get(id)
            .unwrap_or_else(|| panic!("node {id} not resolved"))
            .position_absolute
    }

    // === Gesture helpers ===

    /// Press, move, release on a node.
    pub fn drag_node(&mut self, id: &str, from: Point, to: Point) {
        self.flow
            .pointer_down(from, PointerTarget::Node(id.into()), InputModifiers::default());
        self.flow.pointer_moved(to);
        self.flow.frame();
        self.flow.pointer_up();
    }

    /// Press and release without movement.
    pub fn click_node(&mut self, id: &str, additive: bool) {
        let modifiers = InputModifiers { selection: additive };
        self.flow
            .pointer_down(Point::ZERO, PointerTarget::Node(id.into()), modifiers);
        self.flow.pointer_up();
    }

    pub fn click_canvas(&mut self, at: Point) {
        self.flow
            .pointer_down(at, PointerTarget::Canvas, InputModifiers::default());
        self.flow.pointer_up();
    }

    /// Shift-drag on empty canvas: the marquee gesture.
    pub fn marquee(&mut self, from: Point, to: Point) {
        self.flow
            .pointer_down(from, PointerTarget::Canvas, InputModifiers { selection: true });
        self.flow.pointer_moved(to);
        self.flow.frame();
        self.flow.pointer_up();
    }

    /// Drag from a handle to a screen point and release.
    pub fn connect(&mut self, from: HandleRef, to_screen: Point) {
        let anchor = Point::ZERO; // press position is not used by the engine
        self.flow
            .pointer_down(anchor, PointerTarget::Handle(from), InputModifiers::default());
        self.flow.pointer_moved(to_screen);
        self.flow.frame();
        self.flow.pointer_up();
    }
}

impl Default for FlowHarness {
    fn default() -> Self {
        Self::new()
    }
}
