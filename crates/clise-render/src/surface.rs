//! Drawing surface abstraction.
//!
//! The renderer talks to a [`Surface`] in its own small vocabulary (paths,
//! paints, layers, clip regions) so the same frame can go to a Vello scene,
//! a Canvas2D context, or a recording used by tests. Coordinates passed to a
//! surface are in the current transform's space; `save`/`restore` bracket
//! both the transform and any clip pushed in between.

use crate::images::Bitmap;
use clise_core::model::{BlendMode, ImageEffects, TextAlign};
use clise_core::{Bounds, Color, Point};
use smallvec::SmallVec;

// ─── Paths ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

/// An outline made of subpaths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    cmds: Vec<PathCmd>,
}

/// Bezier magic number for quarter-circle arcs.
const KAPPA: f64 = 0.552_284_749_8;

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cmds(&self) -> &[PathCmd] {
        &self.cmds
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn move_to(&mut self, p: Point) {
        self.cmds.push(PathCmd::MoveTo(p));
    }

    pub fn line_to(&mut self, p: Point) {
        self.cmds.push(PathCmd::LineTo(p));
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point) {
        self.cmds.push(PathCmd::QuadTo(ctrl, to));
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.cmds.push(PathCmd::CubicTo(c1, c2, to));
    }

    pub fn close(&mut self) {
        self.cmds.push(PathCmd::Close);
    }

    /// Append every subpath of `other`.
    pub fn extend(&mut self, other: &PathData) {
        self.cmds.extend_from_slice(&other.cmds);
    }

    pub fn rect(b: &Bounds) -> Self {
        let mut p = Self::new();
        p.push_rect(b);
        p
    }

    /// Clockwise rectangle subpath.
    pub fn push_rect(&mut self, b: &Bounds) {
        self.move_to(Point::new(b.x, b.y));
        self.line_to(Point::new(b.max_x(), b.y));
        self.line_to(Point::new(b.max_x(), b.max_y()));
        self.line_to(Point::new(b.x, b.max_y()));
        self.close();
    }

    /// Rectangle with per-corner radii `[tl, tr, br, bl]`, each clamped to
    /// half the shorter side.
    pub fn rounded_rect(b: &Bounds, radii: [f64; 4]) -> Self {
        let limit = b.width.min(b.height) / 2.0;
        let [tl, tr, br, bl] = radii.map(|r| r.max(0.0).min(limit));
        if tl == 0.0 && tr == 0.0 && br == 0.0 && bl == 0.0 {
            return Self::rect(b);
        }
        let (x0, y0, x1, y1) = (b.x, b.y, b.max_x(), b.max_y());
        let mut p = Self::new();
        p.move_to(Point::new(x0 + tl, y0));
        p.line_to(Point::new(x1 - tr, y0));
        p.corner(Point::new(x1 - tr, y0), Point::new(x1, y0), Point::new(x1, y0 + tr));
        p.line_to(Point::new(x1, y1 - br));
        p.corner(Point::new(x1, y1 - br), Point::new(x1, y1), Point::new(x1 - br, y1));
        p.line_to(Point::new(x0 + bl, y1));
        p.corner(Point::new(x0 + bl, y1), Point::new(x0, y1), Point::new(x0, y1 - bl));
        p.line_to(Point::new(x0, y0 + tl));
        p.corner(Point::new(x0, y0 + tl), Point::new(x0, y0), Point::new(x0 + tl, y0));
        p.close();
        p
    }

    /// Quarter arc from `from` to `to` bending toward `corner`.
    fn corner(&mut self, from: Point, corner: Point, to: Point) {
        if from == corner || to == corner {
            return;
        }
        let c1 = Point::new(
            from.x + (corner.x - from.x) * KAPPA,
            from.y + (corner.y - from.y) * KAPPA,
        );
        let c2 = Point::new(
            to.x + (corner.x - to.x) * KAPPA,
            to.y + (corner.y - to.y) * KAPPA,
        );
        self.cubic_to(c1, c2, to);
    }

    /// Ellipse inscribed in `b`, as four cubic arcs.
    pub fn ellipse(b: &Bounds) -> Self {
        let c = b.center();
        let (rx, ry) = (b.width / 2.0, b.height / 2.0);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        let mut p = Self::new();
        p.move_to(Point::new(c.x + rx, c.y));
        p.cubic_to(
            Point::new(c.x + rx, c.y + ky),
            Point::new(c.x + kx, c.y + ry),
            Point::new(c.x, c.y + ry),
        );
        p.cubic_to(
            Point::new(c.x - kx, c.y + ry),
            Point::new(c.x - rx, c.y + ky),
            Point::new(c.x - rx, c.y),
        );
        p.cubic_to(
            Point::new(c.x - rx, c.y - ky),
            Point::new(c.x - kx, c.y - ry),
            Point::new(c.x, c.y - ry),
        );
        p.cubic_to(
            Point::new(c.x + kx, c.y - ry),
            Point::new(c.x + rx, c.y - ky),
            Point::new(c.x + rx, c.y),
        );
        p.close();
        p
    }

    pub fn line(a: Point, b: Point) -> Self {
        let mut p = Self::new();
        p.move_to(a);
        p.line_to(b);
        p
    }

    /// The same outline shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let t = |p: Point| Point::new(p.x + dx, p.y + dy);
        let cmds = self
            .cmds
            .iter()
            .map(|cmd| match *cmd {
                PathCmd::MoveTo(p) => PathCmd::MoveTo(t(p)),
                PathCmd::LineTo(p) => PathCmd::LineTo(t(p)),
                PathCmd::QuadTo(c, p) => PathCmd::QuadTo(t(c), t(p)),
                PathCmd::CubicTo(c1, c2, p) => PathCmd::CubicTo(t(c1), t(c2), t(p)),
                PathCmd::Close => PathCmd::Close,
            })
            .collect();
        Self { cmds }
    }
}

// ─── Paint ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear {
        start: Point,
        end: Point,
        stops: Vec<ColorStop>,
    },
    Radial {
        center: Point,
        radius: f64,
        stops: Vec<ColorStop>,
    },
}

impl Paint {
    /// Same paint with every color's alpha multiplied by `factor`.
    pub fn with_alpha_factor(&self, factor: f32) -> Paint {
        let fade = |stops: &[ColorStop]| {
            stops
                .iter()
                .map(|s| ColorStop {
                    offset: s.offset,
                    color: s.color.with_alpha_factor(factor),
                })
                .collect()
        };
        match self {
            Paint::Solid(c) => Paint::Solid(c.with_alpha_factor(factor)),
            Paint::Linear { start, end, stops } => Paint::Linear {
                start: *start,
                end: *end,
                stops: fade(stops),
            },
            Paint::Radial {
                center,
                radius,
                stops,
            } => Paint::Radial {
                center: *center,
                radius: *radius,
                stops: fade(stops),
            },
        }
    }

    pub fn is_invisible(&self) -> bool {
        match self {
            Paint::Solid(c) => c.a <= 0.0,
            Paint::Linear { stops, .. } | Paint::Radial { stops, .. } => {
                stops.iter().all(|s| s.color.a <= 0.0)
            }
        }
    }
}

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSpec {
    pub width: f64,
    pub join: LineJoin,
    pub cap: LineCap,
    /// Alternating dash and gap lengths; empty for a solid stroke.
    pub dashes: SmallVec<[f64; 4]>,
}

impl StrokeSpec {
    pub fn solid(width: f64) -> Self {
        Self {
            width,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
            dashes: SmallVec::new(),
        }
    }

    pub fn dashed(width: f64, dash: f64, gap: f64) -> Self {
        let mut spec = Self::solid(width);
        spec.dashes.push(dash);
        spec.dashes.push(gap);
        spec
    }
}

// ─── Clips and layers ────────────────────────────────────────────────────

/// How a clip path restricts later drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// Keep only what falls inside the path.
    Intersect,
    /// Keep only what falls outside the path.
    Difference,
}

/// Offscreen group composited on `pop_layer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub opacity: f32,
    /// Gaussian blur radius in current units; 0 disables the filter.
    pub blur: f64,
    pub blend: BlendMode,
}

impl Layer {
    pub fn opacity(opacity: f32) -> Self {
        Self {
            opacity,
            blur: 0.0,
            blend: BlendMode::Normal,
        }
    }

    pub fn blur(radius: f64) -> Self {
        Self {
            opacity: 1.0,
            blur: radius,
            blend: BlendMode::Normal,
        }
    }
}

/// CSS `globalCompositeOperation` / `mix-blend-mode` name.
pub fn blend_css(mode: BlendMode) -> &'static str {
    match mode {
        BlendMode::Normal => "source-over",
        BlendMode::Multiply => "multiply",
        BlendMode::Screen => "screen",
        BlendMode::Overlay => "overlay",
        BlendMode::Darken => "darken",
        BlendMode::Lighten => "lighten",
        BlendMode::ColorDodge => "color-dodge",
        BlendMode::ColorBurn => "color-burn",
        BlendMode::HardLight => "hard-light",
        BlendMode::SoftLight => "soft-light",
        BlendMode::Difference => "difference",
        BlendMode::Exclusion => "exclusion",
        BlendMode::Hue => "hue",
        BlendMode::Saturation => "saturation",
        BlendMode::Color => "color",
        BlendMode::Luminosity => "luminosity",
    }
}

// ─── Text and images ─────────────────────────────────────────────────────

/// One line of text, anchored at its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Anchor x; its meaning follows `align`.
    pub x: f64,
    pub baseline: f64,
    pub family: String,
    pub size: f64,
    pub weight: u16,
    pub letter_spacing: f64,
    pub align: TextAlign,
    pub color: Color,
}

impl TextRun {
    /// CSS font shorthand, e.g. `600 16px "Inter"`.
    pub fn css_font(&self) -> String {
        format!("{} {}px \"{}\"", self.weight, self.size, self.family)
    }
}

/// Average advance as a fraction of the font size, for surfaces without
/// real metrics.
pub const APPROX_ADVANCE: f64 = 0.6;

/// Placement of (part of) a bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraw {
    /// Target rectangle in current units.
    pub dest: Bounds,
    /// Source rectangle in image pixels.
    pub src: Bounds,
    pub effects: ImageEffects,
}

// ─── Surface ─────────────────────────────────────────────────────────────

/// A 2D drawing target.
pub trait Surface {
    /// Reset the whole target to `color`, ignoring the transform.
    fn clear(&mut self, color: Color);

    fn save(&mut self);
    /// Undo transforms and clips since the matching `save`.
    fn restore(&mut self);

    fn translate(&mut self, dx: f64, dy: f64);
    fn scale(&mut self, sx: f64, sy: f64);
    fn rotate(&mut self, radians: f64);

    fn fill_path(&mut self, path: &PathData, paint: &Paint);
    fn stroke_path(&mut self, path: &PathData, paint: &Paint, stroke: &StrokeSpec);

    /// Restrict drawing until the enclosing `restore`.
    fn clip(&mut self, path: &PathData, mode: ClipMode);

    fn push_layer(&mut self, layer: &Layer);
    fn pop_layer(&mut self);

    fn fill_text(&mut self, run: &TextRun);

    /// Width of `run` in current units.
    fn measure_text(&mut self, run: &TextRun) -> f64 {
        let chars = run.text.chars().count() as f64;
        chars * run.size * APPROX_ADVANCE + (chars - 1.0).max(0.0) * run.letter_spacing
    }

    fn draw_image(&mut self, image: &Bitmap, draw: &ImageDraw);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rounded_rect_without_radius_is_plain_rect() {
        let b = Bounds::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(PathData::rounded_rect(&b, [0.0; 4]), PathData::rect(&b));
    }

    #[test]
    fn radii_are_clamped_to_half_the_short_side() {
        let b = Bounds::new(0.0, 0.0, 10.0, 40.0);
        let p = PathData::rounded_rect(&b, [100.0; 4]);
        assert_eq!(p.cmds()[0], PathCmd::MoveTo(Point::new(5.0, 0.0)));
    }

    #[test]
    fn ellipse_starts_on_the_right_edge() {
        let p = PathData::ellipse(&Bounds::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(p.cmds()[0], PathCmd::MoveTo(Point::new(100.0, 25.0)));
        assert_eq!(p.cmds().len(), 6);
    }

    #[test]
    fn alpha_factor_applies_to_every_stop() {
        let paint = Paint::Linear {
            start: Point::ZERO,
            end: Point::new(1.0, 0.0),
            stops: vec![
                ColorStop {
                    offset: 0.0,
                    color: Color::BLACK,
                },
                ColorStop {
                    offset: 1.0,
                    color: Color::WHITE,
                },
            ],
        };
        let Paint::Linear { stops, .. } = paint.with_alpha_factor(0.5) else {
            panic!("expected linear")
        };
        assert!(stops.iter().all(|s| (s.color.a - 0.5).abs() < 1e-6));
    }
}
