//! Pure geometry primitives shared by every engine.
//!
//! All types here are plain value types in flow-space (or screen-space)
//! coordinates. Nothing in this module holds state or knows about nodes,
//! edges, or the viewport.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A 2D point or vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp both coordinates into the given rectangle.
    pub fn clamp_to(&self, rect: &Rect) -> Point {
        Point {
            x: clamp(self.x, rect.min_x(), rect.max_x()),
            y: clamp(self.y, rect.min_y(), rect.max_y()),
        }
    }

    /// Snap both coordinates to the nearest multiple of the grid spacing.
    ///
    /// A non-positive spacing on an axis leaves that axis untouched.
    pub fn snap_to_grid(&self, grid_x: f32, grid_y: f32) -> Point {
        let snap = |v: f32, g: f32| if g > 0.0 { (v / g).round() * g } else { v };
        Point {
            x: snap(self.x, grid_x),
            y: snap(self.y, grid_y),
        }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Width and height of a node or the on-screen viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a normalized rectangle spanning two corner points.
    ///
    /// The corners may be given in any order; width and height are always
    /// non-negative.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.min_x().min(other.min_x());
        let y = self.min_y().min(other.min_y());
        Rect {
            x,
            y,
            width: self.max_x().max(other.max_x()) - x,
            height: self.max_y().max(other.max_y()) - y,
        }
    }

    /// Bounding rectangle of a set of rectangles, or `None` when empty.
    pub fn bounds_of<I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = Rect>,
    {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }

    /// Area of the overlap between two rectangles, zero when disjoint.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let w = self.max_x().min(other.max_x()) - self.min_x().max(other.min_x());
        let h = self.max_y().min(other.max_y()) - self.min_y().max(other.min_y());
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Strict overlap: shared area greater than zero.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Overlap with closed ranges on both axes.
    ///
    /// Unlike [`intersects`](Self::intersects) this counts touching edges and
    /// degenerate (zero-width or zero-height) rectangles, which is what edge
    /// endpoint boxes need for horizontal or vertical edges.
    pub fn intersects_inclusive(&self, other: &Rect) -> bool {
        self.min_x() <= other.max_x()
            && self.max_x() >= other.min_x()
            && self.min_y() <= other.max_y()
            && self.max_y() >= other.min_y()
    }

    /// Whether `other` lies entirely inside `self` (boundaries included).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    /// Grow the rectangle by `amount` on every side.
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }
}

/// Clamp a value into `[lo, hi]`.
///
/// Tolerates `lo > hi` (returns the midpoint), which happens when a pan
/// extent is smaller than the visible area.
pub fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        v.max(lo).min(hi)
    }
}

/// Rotate a point around a center by an angle in degrees.
pub fn rotate_point(p: Point, center: Point, degrees: f32) -> Point {
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    let d = p - center;
    Point {
        x: center.x + d.x * cos - d.y * sin,
        y: center.y + d.x * sin + d.y * cos,
    }
}
