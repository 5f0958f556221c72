//! Viewport model: the flow-space to screen-space affine transform.
//!
//! `Viewport { x, y, zoom }` maps a flow point `p` to the screen point
//! `p * zoom + (x, y)`. The pure conversions live here as free functions so
//! adapters can reuse them for minimap and overlay coordinate mapping; the
//! stateful [`ViewportController`] enforces zoom bounds and pan extents.

use crate::geometry::{clamp, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// The current pan/zoom transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }
}

/// Convert a viewport-local screen point to flow space.
pub fn screen_to_flow(p: Point, viewport: &Viewport) -> Point {
    Point {
        x: (p.x - viewport.x) / viewport.zoom,
        y: (p.y - viewport.y) / viewport.zoom,
    }
}

/// Convert a flow-space point to viewport-local screen space.
pub fn flow_to_screen(p: Point, viewport: &Viewport) -> Point {
    Point {
        x: p.x * viewport.zoom + viewport.x,
        y: p.y * viewport.zoom + viewport.y,
    }
}

/// Static configuration for a [`ViewportController`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportOptions {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Flow-space rectangle the visible area may not leave, if set.
    pub translate_extent: Option<Rect>,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            translate_extent: None,
        }
    }
}

/// Options for [`ViewportController::fit_view`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitViewOptions {
    /// Fractional padding around the framed bounds (0.1 = 10%).
    pub padding: f32,
    /// Override the controller's zoom bounds for this fit only.
    pub min_zoom: Option<f32>,
    pub max_zoom: Option<f32>,
    /// Animation duration hint in milliseconds. The controller applies the
    /// target viewport immediately; adapters may interpolate toward it.
    pub duration: Option<f32>,
}

impl Default for FitViewOptions {
    fn default() -> Self {
        Self {
            padding: 0.1,
            min_zoom: None,
            max_zoom: None,
            duration: None,
        }
    }
}

/// Owns the viewport value and applies bounded pan/zoom mutations.
///
/// One controller per flow instance. The on-screen viewport size must be
/// reported via [`set_viewport_size`](Self::set_viewport_size) before
/// `fit_view` or extent clamping can do anything useful.
#[derive(Clone, Debug)]
pub struct ViewportController {
    viewport: Viewport,
    options: ViewportOptions,
    size: Size,
}

impl ViewportController {
    pub fn new(initial: Viewport, options: ViewportOptions) -> Self {
        let mut ctrl = Self {
            viewport: Viewport {
                zoom: initial.zoom.clamp(options.min_zoom, options.max_zoom),
                ..initial
            },
            options,
            size: Size::default(),
        };
        ctrl.clamp_to_extent();
        ctrl
    }

    /// Current transform snapshot.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn options(&self) -> &ViewportOptions {
        &self.options
    }

    /// Report the on-screen size of the rendered viewport in pixels.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.size = size;
        self.clamp_to_extent();
    }

    /// Replace the translate extent and re-clamp the current transform.
    pub fn set_extent(&mut self, extent: Option<Rect>) {
        self.options.translate_extent = extent;
        self.clamp_to_extent();
    }

    /// Set the transform directly, subject to zoom bounds and extent.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            zoom: viewport.zoom.clamp(self.options.min_zoom, self.options.max_zoom),
            ..viewport
        };
        self.clamp_to_extent();
    }

    /// Translate by a screen-space delta, converted at the current zoom.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.viewport.x += dx / self.viewport.zoom;
        self.viewport.y += dy / self.viewport.zoom;
        self.clamp_to_extent();
    }

    /// Rescale to `target_zoom` while keeping `anchor_screen` fixed on
    /// screen.
    ///
    /// The translation is recomputed so the flow point under the anchor maps
    /// back to the same screen coordinate after the zoom change.
    pub fn zoom_to(&mut self, target_zoom: f32, anchor_screen: Point) {
        let zoom = target_zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        let anchor_flow = screen_to_flow(anchor_screen, &self.viewport);
        self.viewport = Viewport {
            x: anchor_screen.x - anchor_flow.x * zoom,
            y: anchor_screen.y - anchor_flow.y * zoom,
            zoom,
        };
        self.clamp_to_extent();
    }

    /// Multiply the current zoom by `factor`, anchored at `anchor_screen`.
    pub fn zoom_by(&mut self, factor: f32, anchor_screen: Point) {
        self.zoom_to(self.viewport.zoom * factor, anchor_screen);
    }

    /// Compute and apply the transform that frames `bounds`.
    ///
    /// Returns `false` (leaving the viewport unmodified) when the bounds or
    /// the reported viewport size are empty.
    pub fn fit_view(&mut self, bounds: Rect, opts: FitViewOptions) -> bool {
        if bounds.width <= 0.0 || bounds.height <= 0.0 || self.size.is_empty() {
            return false;
        }
        let min_zoom = opts.min_zoom.unwrap_or(self.options.min_zoom);
        let max_zoom = opts.max_zoom.unwrap_or(self.options.max_zoom);
        let pad = 1.0 + opts.padding.max(0.0);

        let zoom_x = self.size.width / (bounds.width * pad);
        let zoom_y = self.size.height / (bounds.height * pad);
        let zoom = zoom_x.min(zoom_y).clamp(min_zoom, max_zoom);

        let center = bounds.center();
        self.viewport = Viewport {
            x: self.size.width / 2.0 - center.x * zoom,
            y: self.size.height / 2.0 - center.y * zoom,
            zoom,
        };
        self.clamp_to_extent();
        true
    }

    /// The flow-space rectangle currently visible, if the viewport size is
    /// known.
    pub fn visible_rect(&self) -> Option<Rect> {
        if self.size.is_empty() {
            return None;
        }
        let top_left = screen_to_flow(Point::ZERO, &self.viewport);
        let bottom_right = screen_to_flow(
            Point::new(self.size.width, self.size.height),
            &self.viewport,
        );
        Some(Rect::from_points(top_left, bottom_right))
    }

    /// Clamp the translation per-axis so the visible flow rectangle stays
    /// inside the configured extent. Each axis is clamped independently
    /// rather than rejecting the whole pan.
    fn clamp_to_extent(&mut self) {
        let Some(extent) = self.options.translate_extent else {
            return;
        };
        if self.size.is_empty() {
            return;
        }
        let z = self.viewport.zoom;
        // Visible left edge >= extent left; visible right edge <= extent right.
        let lo_x = self.size.width - extent.max_x() * z;
        let hi_x = -extent.min_x() * z;
        let lo_y = self.size.height - extent.max_y() * z;
        let hi_y = -extent.min_y() * z;
        self.viewport.x = clamp(self.viewport.x, lo_x, hi_x);
        self.viewport.y = clamp(self.viewport.y, lo_y, hi_y);
    }
}
