//! Flow data model: nodes, edges, and handles.
//!
//! These are the required geometry/id fields the engine operates on. Any
//! consumer payload rides along in the node's opaque `data` field, which the
//! engine never inspects.

use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which end of a connection a handle represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn opposite(self) -> Self {
        match self {
            HandleType::Source => HandleType::Target,
            HandleType::Target => HandleType::Source,
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleType::Source => write!(f, "source"),
            HandleType::Target => write!(f, "target"),
        }
    }
}

/// The side of a node a handle sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Top,
    Right,
    Bottom,
    Left,
}

/// Fractional anchor point (0–1 per axis) used when converting a node's
/// `position` + `dimensions` into a rendered top-left corner.
///
/// `Origin::TOP_LEFT` (the default) makes `position` the top-left corner;
/// `(0.5, 0.5)` centers the node on its position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub x: f32,
    pub y: f32,
}

impl Origin {
    pub const TOP_LEFT: Origin = Origin { x: 0.0, y: 0.0 };
    pub const CENTER: Origin = Origin { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::TOP_LEFT
    }
}

/// A connection anchor declared on a node.
///
/// A node may own multiple handles of the same type, disambiguated by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandleSpec {
    pub id: Option<String>,
    pub kind: HandleType,
    pub position: Position,
}

impl HandleSpec {
    pub fn new(kind: HandleType, position: Position) -> Self {
        Self {
            id: None,
            kind,
            position,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A flow node.
///
/// `position` is parent-relative when `parent_id` is set, absolute otherwise.
/// The type parameter carries an opaque consumer payload (default `()`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node<T = ()> {
    pub id: String,
    pub position: Point,
    pub dimensions: Option<Size>,
    pub parent_id: Option<String>,
    pub origin: Origin,
    pub handles: Vec<HandleSpec>,
    /// Per-node drag extent in absolute flow coordinates; overrides the
    /// engine-wide extent when set.
    pub extent: Option<Rect>,
    pub draggable: bool,
    pub selectable: bool,
    pub connectable: bool,
    pub hidden: bool,
    pub selected: bool,
    pub z_index: Option<i32>,
    pub data: T,
}

impl Node<()> {
    pub fn new(id: impl Into<String>, position: Point) -> Self {
        Self {
            id: id.into(),
            position,
            dimensions: None,
            parent_id: None,
            origin: Origin::TOP_LEFT,
            handles: Vec::new(),
            extent: None,
            draggable: true,
            selectable: true,
            connectable: true,
            hidden: false,
            selected: false,
            z_index: None,
            data: (),
        }
    }
}

impl<T> Node<T> {
    pub fn with_dimensions(mut self, width: f32, height: f32) -> Self {
        self.dimensions = Some(Size::new(width, height));
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_handles(mut self, handles: Vec<HandleSpec>) -> Self {
        self.handles = handles;
        self
    }

    pub fn with_extent(mut self, extent: Rect) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    /// Replace the opaque payload, changing the payload type.
    pub fn with_data<U>(self, data: U) -> Node<U> {
        Node {
            id: self.id,
            position: self.position,
            dimensions: self.dimensions,
            parent_id: self.parent_id,
            origin: self.origin,
            handles: self.handles,
            extent: self.extent,
            draggable: self.draggable,
            selectable: self.selectable,
            connectable: self.connectable,
            hidden: self.hidden,
            selected: self.selected,
            z_index: self.z_index,
            data,
        }
    }
}

/// A connection between two nodes, via optional named handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub selected: bool,
    pub hidden: bool,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            selected: false,
            hidden: false,
        }
    }

    pub fn with_handles(
        mut self,
        source_handle: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.source_handle = Some(source_handle.into());
        self.target_handle = Some(target_handle.into());
        self
    }
}
