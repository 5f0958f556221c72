//! Pan/zoom gesture engine.
//!
//! Translates wheel, pinch, double-click, and drag-pan input into viewport
//! operations. Zoom always anchors at the pointer so the flow point under
//! the cursor stays put; min/max zoom and the translate extent are enforced
//! by the viewport itself.

use crate::geometry::Point;
use crate::viewport::ViewportController;

#[derive(Clone, Debug, PartialEq)]
pub struct PanZoomOptions {
    /// Dragging empty canvas pans the viewport. When disabled, canvas drags
    /// fall through to marquee selection.
    pub pan_on_drag: bool,
    /// Zoom factor applied by a double click, anchored at the pointer.
    /// `None` disables the gesture.
    pub double_click_zoom: Option<f32>,
    /// Exponent scale for wheel zoom: one wheel notch of `delta_y = -100`
    /// multiplies zoom by `2^(100 * speed)`.
    pub wheel_zoom_speed: f32,
}

impl Default for PanZoomOptions {
    fn default() -> Self {
        Self {
            pan_on_drag: true,
            double_click_zoom: Some(2.0),
            wheel_zoom_speed: 0.002,
        }
    }
}

/// Drives viewport gestures. Holds only drag-pan state; the viewport is
/// passed in per call.
#[derive(Clone, Debug, Default)]
pub struct PanZoomController {
    options: PanZoomOptions,
    /// Last pointer position of an active drag-pan, in screen space.
    pan_anchor: Option<Point>,
}

impl PanZoomController {
    pub fn new(options: PanZoomOptions) -> Self {
        Self {
            options,
            pan_anchor: None,
        }
    }

    pub fn options(&self) -> &PanZoomOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PanZoomOptions) {
        self.options = options;
    }

    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    /// Wheel input. With the zoom modifier held the wheel zooms around the
    /// pointer; otherwise it pans opposite the scroll direction.
    pub fn on_wheel(
        &mut self,
        delta: Point,
        pointer_screen: Point,
        zoom_modifier: bool,
        viewport: &mut ViewportController,
    ) {
        if zoom_modifier {
            let factor = 2f32.powf(-delta.y * self.options.wheel_zoom_speed);
            viewport.zoom_by(factor, pointer_screen);
        } else {
            viewport.pan(-delta.x, -delta.y);
        }
    }

    /// Trackpad pinch: a relative scale factor anchored at the pointer.
    pub fn on_pinch(
        &mut self,
        scale: f32,
        pointer_screen: Point,
        viewport: &mut ViewportController,
    ) {
        if scale > 0.0 {
            viewport.zoom_by(scale, pointer_screen);
        }
    }

    /// Double click zooms in by the configured factor, if enabled.
    pub fn on_double_click(&mut self, pointer_screen: Point, viewport: &mut ViewportController) {
        if let Some(factor) = self.options.double_click_zoom {
            viewport.zoom_by(factor, pointer_screen);
        }
    }

    /// Begin a drag-pan at the given pointer position. Returns false when
    /// drag-panning is disabled, letting the caller route the press to
    /// marquee selection instead.
    pub fn begin_pan(&mut self, pointer_screen: Point) -> bool {
        if !self.options.pan_on_drag {
            return false;
        }
        self.pan_anchor = Some(pointer_screen);
        true
    }

    /// Continue an active drag-pan. Returns true when the viewport moved.
    pub fn on_pointer_move(
        &mut self,
        pointer_screen: Point,
        viewport: &mut ViewportController,
    ) -> bool {
        let Some(last) = self.pan_anchor else {
            return false;
        };
        let delta = pointer_screen - last;
        self.pan_anchor = Some(pointer_screen);
        if delta == Point::ZERO {
            return false;
        }
        viewport.pan(delta.x, delta.y);
        true
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    pub fn cancel(&mut self) {
        self.pan_anchor = None;
    }
}
