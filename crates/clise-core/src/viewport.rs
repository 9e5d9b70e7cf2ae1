//! Pan/zoom camera and screen ↔ scene conversion.
//!
//! Screen coordinates are CSS pixels relative to the page; `origin` is the
//! canvas element's top-left on the page. Device pixel ratio is applied by
//! the renderer, not here.

use crate::geometry::{Bounds, Point};
use serde::{Deserialize, Serialize};

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.1, max: 10.0 }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() || zoom <= 0.0 {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f64,
    #[serde(skip)]
    pub limits: ZoomLimits,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
            limits: ZoomLimits::default(),
        }
    }
}

impl Viewport {
    pub fn new(pan: Point, zoom: f64) -> Self {
        let limits = ZoomLimits::default();
        Self {
            pan,
            zoom: limits.clamp(zoom),
            limits,
        }
    }

    pub fn with_limits(mut self, limits: ZoomLimits) -> Self {
        self.limits = limits;
        self.zoom = limits.clamp(self.zoom);
        self
    }

    /// `(screen − origin − pan) / zoom`
    pub fn to_scene(&self, screen: Point, origin: Point) -> Point {
        Point::new(
            (screen.x - origin.x - self.pan.x) / self.zoom,
            (screen.y - origin.y - self.pan.y) / self.zoom,
        )
    }

    /// Inverse of [`Viewport::to_scene`].
    pub fn to_screen(&self, scene: Point, origin: Point) -> Point {
        Point::new(
            scene.x * self.zoom + self.pan.x + origin.x,
            scene.y * self.zoom + self.pan.y + origin.y,
        )
    }

    /// Change zoom keeping the scene point under `pivot` (canvas-local
    /// screen coordinates) fixed: `pan' = pivot − (pivot − pan) × z'/z`.
    pub fn zoom_at(&mut self, pivot: Point, zoom: f64) {
        let next = self.limits.clamp(zoom);
        let ratio = next / self.zoom;
        self.pan = Point::new(
            pivot.x - (pivot.x - self.pan.x) * ratio,
            pivot.y - (pivot.y - self.pan.y) * ratio,
        );
        self.zoom = next;
    }

    /// Multiply zoom by `factor` around `pivot`.
    pub fn zoom_by(&mut self, factor: f64, pivot: Point) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom_at(pivot, self.zoom * factor);
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    /// Scene rectangle visible in a `width × height` CSS-pixel canvas.
    pub fn visible_rect(&self, width: f64, height: f64) -> Bounds {
        Bounds::new(
            -self.pan.x / self.zoom,
            -self.pan.y / self.zoom,
            width / self.zoom,
            height / self.zoom,
        )
    }

    /// Put `point` at the middle of a `width × height` view.
    pub fn center_on(&mut self, point: Point, width: f64, height: f64) {
        self.pan = Point::new(
            width / 2.0 - point.x * self.zoom,
            height / 2.0 - point.y * self.zoom,
        );
    }

    /// Zoom and pan so `bounds` fills the view with `padding` pixels spare
    /// on every side. Degenerate bounds only recenter.
    pub fn fit_bounds(&mut self, bounds: &Bounds, width: f64, height: f64, padding: f64) {
        if !bounds.is_finite() {
            return;
        }
        let avail_w = (width - padding * 2.0).max(1.0);
        let avail_h = (height - padding * 2.0).max(1.0);
        if bounds.width > 0.0 && bounds.height > 0.0 {
            self.zoom = self
                .limits
                .clamp((avail_w / bounds.width).min(avail_h / bounds.height));
        }
        self.center_on(bounds.center(), width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip_through_screen() {
        let vp = Viewport::new(Point::new(30.0, -12.0), 1.5);
        let origin = Point::new(8.0, 64.0);
        let scene = Point::new(123.0, 45.0);
        let back = vp.to_scene(vp.to_screen(scene, origin), origin);
        assert!((back.x - scene.x).abs() < 1e-9);
        assert!((back.y - scene.y).abs() < 1e-9);
    }

    #[test]
    fn zoom_keeps_pivot_fixed() {
        let mut vp = Viewport::default();
        let pivot = Point::new(50.0, 50.0);
        let before = vp.to_scene(pivot, Point::ZERO);
        vp.zoom_at(pivot, 2.0);
        assert_eq!(vp.pan, Point::new(-50.0, -50.0));
        assert_eq!(vp.to_screen(before, Point::ZERO), pivot);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::default();
        vp.zoom_at(Point::ZERO, 100.0);
        assert_eq!(vp.zoom, 10.0);
        vp.zoom_at(Point::ZERO, 0.0);
        assert_eq!(vp.zoom, 0.1);
    }

    #[test]
    fn visible_rect_follows_pan_and_zoom() {
        let vp = Viewport::new(Point::new(-100.0, -50.0), 2.0);
        assert_eq!(vp.visible_rect(800.0, 600.0), Bounds::new(50.0, 25.0, 400.0, 300.0));
    }

    #[test]
    fn fit_centers_content() {
        let mut vp = Viewport::default();
        vp.fit_bounds(&Bounds::new(0.0, 0.0, 200.0, 100.0), 440.0, 440.0, 20.0);
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(vp.to_screen(Point::new(100.0, 50.0), Point::ZERO), Point::new(220.0, 220.0));
    }
}
