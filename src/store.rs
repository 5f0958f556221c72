//! Node/edge position store.
//!
//! [`resolve_nodes`] turns the consumer's node list into a
//! [`PositionStore`] of [`ResolvedNode`]s: absolute flow-space positions
//! with parent offsets applied transitively, z-order, and handle bounding
//! boxes. Everything here is viewport-independent; pan/zoom is a
//! display-time transform and never triggers re-resolution.

use crate::error::{ErrorSink, FlowError};
use crate::geometry::{Point, Rect};
use crate::node::{Edge, HandleType, Node, Position};
use ahash::{AHashMap, AHashSet};

/// Side length of a handle's bounding box in flow units.
pub const HANDLE_SIZE: f32 = 6.0;

/// Z elevation applied to selected nodes so a dragged selection renders
/// above its siblings.
pub const ELEVATED_Z: i32 = 1000;

/// A handle's resolved geometry, relative to the node's rendered top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct HandleBounds {
    pub id: Option<String>,
    pub kind: HandleType,
    pub position: Position,
    pub rect: Rect,
}

impl HandleBounds {
    /// Center of the handle box, relative to the node's rendered top-left.
    pub fn anchor(&self) -> Point {
        self.rect.center()
    }
}

/// Reference to one handle on one node.
#[derive(Clone, Debug, PartialEq)]
pub struct HandleRef {
    pub node_id: String,
    pub handle_id: Option<String>,
    pub kind: HandleType,
}

/// Result of a flow-space handle hit test.
#[derive(Clone, Debug, PartialEq)]
pub struct HandleHit {
    pub handle: HandleRef,
    /// Absolute flow-space anchor point of the handle.
    pub anchor: Point,
}

/// A node with its derived geometry.
#[derive(Clone, Debug)]
pub struct ResolvedNode<T = ()> {
    pub node: Node<T>,
    /// Flow-space position with all parent offsets applied. The node's
    /// `origin` does not shift this value; it only affects [`rect`](Self::rect).
    pub position_absolute: Point,
    /// Nesting depth: 0 for parentless nodes.
    pub depth: usize,
    /// Render order; higher is on top.
    pub z: i32,
    pub handle_bounds: Vec<HandleBounds>,
}

impl<T> ResolvedNode<T> {
    /// The rendered bounding box: absolute position shifted by the origin
    /// anchor. Nodes without dimensions get a zero-size box.
    pub fn rect(&self) -> Rect {
        let (w, h) = self
            .node
            .dimensions
            .map(|d| (d.width, d.height))
            .unwrap_or((0.0, 0.0));
        Rect::new(
            self.position_absolute.x - self.node.origin.x * w,
            self.position_absolute.y - self.node.origin.y * h,
            w,
            h,
        )
    }

    /// Absolute flow-space anchor of one of this node's handles.
    pub fn handle_anchor(&self, handle: &HandleBounds) -> Point {
        self.rect().position() + handle.anchor()
    }

    /// Look up a handle by explicit id, or the first handle of `kind` when
    /// no id is given.
    pub fn find_handle(&self, id: Option<&str>, kind: HandleType) -> Option<&HandleBounds> {
        match id {
            Some(id) => self
                .handle_bounds
                .iter()
                .find(|h| h.id.as_deref() == Some(id)),
            None => self.handle_bounds.iter().find(|h| h.kind == kind),
        }
    }
}

/// Authoritative map from node id to resolved geometry.
///
/// Iteration follows the input node order, so repeated resolves are
/// deterministic.
#[derive(Clone, Debug)]
pub struct PositionStore<T = ()> {
    nodes: AHashMap<String, ResolvedNode<T>>,
    order: Vec<String>,
    children: AHashMap<String, Vec<String>>,
}

impl<T> Default for PositionStore<T> {
    fn default() -> Self {
        Self {
            nodes: AHashMap::new(),
            order: Vec::new(),
            children: AHashMap::new(),
        }
    }
}

impl<T> PositionStore<T> {
    pub fn get(&self, id: &str) -> Option<&ResolvedNode<T>> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedNode<T>> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Ids of the full descendant subtree of `id`, depth-first.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = match self.children.get(id) {
            Some(kids) => kids.iter().map(String::as_str).collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current.to_string());
            if let Some(kids) = self.children.get(current) {
                stack.extend(kids.iter().map(String::as_str));
            }
        }
        out
    }

    /// Bounding rectangle of all visible nodes, or `None` when there are
    /// none. This is the input `fit_view` frames.
    pub fn node_bounds(&self) -> Option<Rect> {
        Rect::bounds_of(self.iter().filter(|n| !n.node.hidden).map(|n| n.rect()))
    }

    /// Find the nearest connectable handle within `radius` flow units of a
    /// flow-space point.
    ///
    /// Callers convert a screen-space hit radius with the current zoom
    /// (`radius_px / zoom`) so the grab target stays constant on screen.
    pub fn find_handle_at(&self, p: Point, radius: f32) -> Option<HandleHit> {
        let mut best: Option<(f32, HandleHit)> = None;
        for resolved in self.iter() {
            if resolved.node.hidden || !resolved.node.connectable {
                continue;
            }
            for hb in &resolved.handle_bounds {
                let anchor = resolved.handle_anchor(hb);
                let dist = anchor.distance_to(p);
                if dist <= radius && best.as_ref().map_or(true, |(d, _)| dist < *d) {
                    best = Some((
                        dist,
                        HandleHit {
                            handle: HandleRef {
                                node_id: resolved.node.id.clone(),
                                handle_id: hb.id.clone(),
                                kind: hb.kind,
                            },
                            anchor,
                        },
                    ));
                }
            }
        }
        best.map(|(_, hit)| hit)
    }
}

/// Resolve a node list into a [`PositionStore`].
///
/// Cyclic parent chains are reported through `errors` and every node on
/// (or below) the cycle is excluded. A missing parent is reported and the
/// node resolved as parentless.
pub fn resolve_nodes<T: Clone>(nodes: &[Node<T>], errors: &ErrorSink) -> PositionStore<T> {
    let index: AHashMap<&str, &Node<T>> =
        nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut memo: AHashMap<String, Option<(Point, usize)>> = AHashMap::new();
    let mut visiting: AHashSet<String> = AHashSet::new();

    let mut store = PositionStore {
        nodes: AHashMap::with_capacity(nodes.len()),
        order: Vec::with_capacity(nodes.len()),
        children: AHashMap::new(),
    };

    for node in nodes {
        let Some((position_absolute, depth)) =
            resolve_absolute(&node.id, &index, &mut memo, &mut visiting, errors)
        else {
            continue;
        };

        let z = node.z_index.unwrap_or(depth as i32)
            + if node.selected { ELEVATED_Z } else { 0 };

        let resolved = ResolvedNode {
            node: node.clone(),
            position_absolute,
            depth,
            z,
            handle_bounds: compute_handle_bounds(node),
        };

        if let Some(parent) = &node.parent_id {
            if index.contains_key(parent.as_str()) {
                store
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }
        store.order.push(node.id.clone());
        store.nodes.insert(node.id.clone(), resolved);
    }

    store
}

/// Walk the parent chain of `id`, memoizing absolute positions and depths.
/// Returns `None` for nodes on or below a cyclic chain.
fn resolve_absolute<T>(
    id: &str,
    index: &AHashMap<&str, &Node<T>>,
    memo: &mut AHashMap<String, Option<(Point, usize)>>,
    visiting: &mut AHashSet<String>,
    errors: &ErrorSink,
) -> Option<(Point, usize)> {
    if let Some(cached) = memo.get(id) {
        return *cached;
    }
    if !visiting.insert(id.to_string()) {
        errors.report(FlowError::CyclicParentChain(id.to_string()));
        memo.insert(id.to_string(), None);
        return None;
    }

    let node = index.get(id).copied();
    let result = match node {
        None => None,
        Some(n) => match &n.parent_id {
            None => Some((n.position, 0)),
            Some(parent_id) => {
                if !index.contains_key(parent_id.as_str()) {
                    errors.report(FlowError::MissingParent {
                        node_id: n.id.clone(),
                        parent_id: parent_id.clone(),
                    });
                    Some((n.position, 0))
                } else {
                    resolve_absolute(parent_id, index, memo, visiting, errors)
                        .map(|(parent_abs, parent_depth)| {
                            (parent_abs + n.position, parent_depth + 1)
                        })
                }
            }
        },
    };

    visiting.remove(id);
    memo.insert(id.to_string(), result);
    result
}

/// Handle boxes from the node's dimensions and each handle's declared side,
/// relative to the rendered top-left. Independent of viewport zoom.
fn compute_handle_bounds<T>(node: &Node<T>) -> Vec<HandleBounds> {
    let (w, h) = node
        .dimensions
        .map(|d| (d.width, d.height))
        .unwrap_or((0.0, 0.0));
    node.handles
        .iter()
        .map(|spec| {
            let center = match spec.position {
                Position::Top => Point::new(w / 2.0, 0.0),
                Position::Right => Point::new(w, h / 2.0),
                Position::Bottom => Point::new(w / 2.0, h),
                Position::Left => Point::new(0.0, h / 2.0),
            };
            HandleBounds {
                id: spec.id.clone(),
                kind: spec.kind,
                position: spec.position,
                rect: Rect::new(
                    center.x - HANDLE_SIZE / 2.0,
                    center.y - HANDLE_SIZE / 2.0,
                    HANDLE_SIZE,
                    HANDLE_SIZE,
                ),
            }
        })
        .collect()
}

/// An edge whose endpoints resolved to concrete handle anchors.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEdge {
    pub edge: Edge,
    pub source_anchor: Point,
    pub target_anchor: Point,
}

impl ResolvedEdge {
    /// Bounding box of the edge's endpoints, used by marquee selection.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.source_anchor, self.target_anchor)
    }
}

/// Resolve edge endpoints against the store.
///
/// Edges referencing a missing node or handle are reported through `errors`
/// and excluded from the output (the consumer decides whether to delete
/// them). Hidden edges, and edges touching hidden nodes, are skipped
/// silently.
pub fn resolve_edges<T>(
    edges: &[Edge],
    store: &PositionStore<T>,
    errors: &ErrorSink,
) -> Vec<ResolvedEdge> {
    edges
        .iter()
        .filter(|e| !e.hidden)
        .filter_map(|edge| {
            let source_anchor = endpoint_anchor(
                edge,
                &edge.source,
                edge.source_handle.as_deref(),
                HandleType::Source,
                store,
                errors,
            )?;
            let target_anchor = endpoint_anchor(
                edge,
                &edge.target,
                edge.target_handle.as_deref(),
                HandleType::Target,
                store,
                errors,
            )?;
            Some(ResolvedEdge {
                edge: edge.clone(),
                source_anchor,
                target_anchor,
            })
        })
        .collect()
}

fn endpoint_anchor<T>(
    edge: &Edge,
    node_id: &str,
    handle_id: Option<&str>,
    kind: HandleType,
    store: &PositionStore<T>,
    errors: &ErrorSink,
) -> Option<Point> {
    let Some(resolved) = store.get(node_id) else {
        errors.report(FlowError::MissingEdgeNode {
            edge_id: edge.id.clone(),
            node_id: node_id.to_string(),
        });
        return None;
    };
    if resolved.node.hidden {
        return None;
    }
    match resolved.find_handle(handle_id, kind) {
        Some(hb) => Some(resolved.handle_anchor(hb)),
        None => {
            errors.report(FlowError::MissingHandle {
                edge_id: edge.id.clone(),
                node_id: node_id.to_string(),
                handle_id: handle_id.map(str::to_string),
                handle_type: kind,
            });
            None
        }
    }
}
