//! Framework-agnostic interaction engine for node-link flow editors.
//!
//! The engine owns the model (nodes, edges, viewport) and the gesture state
//! machines that mutate it: node dragging, connecting handles, marquee
//! selection, and pan/zoom. It takes pointer input in screen space, does all
//! of its reasoning in flow space, and reports changes through events, so
//! any rendering layer can sit on top.
//!
//! [`FlowController`] is the usual entry point; the per-gesture controllers
//! underneath it can also be driven directly.
//!
//! ```
//! use flowgraph::{
//!     ErrorSink, FlowConfig, FlowController, InputModifiers, Node, Point, PointerTarget,
//! };
//!
//! let mut flow = FlowController::new(FlowConfig::default(), ErrorSink::silent());
//! flow.set_viewport_size(800.0, 600.0);
//! flow.set_nodes(vec![
//!     Node::new("a", Point::new(0.0, 0.0)).with_dimensions(100.0, 50.0),
//! ]);
//!
//! // Drag node "a" 30px to the right.
//! flow.pointer_down(
//!     Point::new(10.0, 10.0),
//!     PointerTarget::Node("a".into()),
//!     InputModifiers::default(),
//! );
//! flow.pointer_moved(Point::new(40.0, 10.0));
//! flow.frame();
//! flow.pointer_up();
//!
//! assert_eq!(flow.nodes()[0].position, Point::new(30.0, 0.0));
//! ```

pub mod connection;
pub mod controller;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod node;
pub mod pan_zoom;
pub mod selection;
pub mod store;
pub mod viewport;

pub use connection::{
    AlwaysValid, CompositeValidator, Connection, ConnectionController, ConnectionMode,
    ConnectionOptions, ConnectionState, ConnectionValidator,
};
pub use controller::{
    FlowConfig, FlowController, FlowEvent, InputModifiers, MoveCoalescer, PointerTarget,
};
pub use drag::{DragController, DragOptions, DragOutcome, NodePositionChange};
pub use error::{ErrorSink, FlowError};
pub use geometry::{Point, Rect, Size};
pub use node::{Edge, HandleSpec, HandleType, Node, Origin, Position};
pub use pan_zoom::{PanZoomController, PanZoomOptions};
pub use selection::{
    SelectionChange, SelectionController, SelectionManager, SelectionMode, SelectionOutcome,
};
pub use store::{
    resolve_edges, resolve_nodes, HandleBounds, HandleRef, PositionStore, ResolvedEdge,
    ResolvedNode,
};
pub use viewport::{
    flow_to_screen, screen_to_flow, FitViewOptions, Viewport, ViewportController, ViewportOptions,
};
