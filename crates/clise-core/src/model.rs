//! Canvas data model.
//!
//! Every element is one `Element` record: the fields shared by all shapes
//! (geometry, paint, visibility) plus an `ElementKind` carrying the
//! variant-specific data. Matching on `ElementKind` is exhaustive, so adding a
//! kind forces every draw / resize / hit-test branch to handle it.
//!
//! `parent_id` is a lookup key to an enclosing frame. It is recomputed from
//! geometry by [`crate::layout::recompute_parents`] and is never an
//! ownership edge.

use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

// ─── Paint ───────────────────────────────────────────────────────────────

/// A gradient stop. `color` is any string accepted by [`crate::parse_color`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: String,
}

/// Gradient paints. Geometry is relative to the element box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Gradient {
    Linear {
        angle: f64, // degrees, 0 = left → right
        stops: Vec<GradientStop>,
    },
    Radial {
        /// Center in unit box coordinates (0.5, 0.5 = middle).
        cx: f64,
        cy: f64,
        /// Radius as a fraction of the shorter side.
        radius: f64,
        stops: Vec<GradientStop>,
    },
    /// Grid of colors, `rows × cols`, row-major.
    Mesh {
        rows: u32,
        cols: u32,
        colors: Vec<String>,
    },
}

/// Fill or stroke paint: a color string or a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fill {
    Solid(String),
    Gradient(Gradient),
}

impl Fill {
    pub fn solid(color: &str) -> Self {
        Fill::Solid(color.to_string())
    }

    pub fn is_transparent(&self) -> bool {
        match self {
            Fill::Solid(c) => c.eq_ignore_ascii_case("transparent") || c.is_empty(),
            Fill::Gradient(_) => false,
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Solid("#D9D9D9".into())
    }
}

// ─── Stroke & shadow ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
}

/// Where the stroke sits relative to the shape outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokePosition {
    #[default]
    Center,
    Inside,
    Outside,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub paint: Fill,
    pub width: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub style: StrokeStyle,
    #[serde(default)]
    pub position: StrokePosition,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            paint: Fill::solid("#000000"),
            width: 1.0,
            opacity: 1.0,
            style: StrokeStyle::Solid,
            position: StrokePosition::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowKind {
    #[default]
    Drop,
    Inner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    #[serde(default)]
    pub spread: f64,
    pub color: String,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default, rename = "type")]
    pub kind: ShadowKind,
}

// ─── Variant data ────────────────────────────────────────────────────────

/// Per-corner radius for rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerRadius {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

impl CornerRadius {
    pub const fn uniform(r: f64) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top_left == 0.0
            && self.top_right == 0.0
            && self.bottom_right == 0.0
            && self.bottom_left == 0.0
    }
}

/// Main-axis direction of a frame's auto layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Children keep their own positions.
    #[default]
    None,
    Row,
    Column,
}

/// Cross-axis alignment of auto-laid-out children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlign {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameLayout {
    #[serde(default)]
    pub direction: LayoutDirection,
    #[serde(default)]
    pub gap: f64,
    #[serde(default)]
    pub padding: f64,
    #[serde(default)]
    pub align: LayoutAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    pub fn apply(self, s: &str) -> String {
        match self {
            TextTransform::None => s.to_string(),
            TextTransform::Uppercase => s.to_uppercase(),
            TextTransform::Lowercase => s.to_lowercase(),
            TextTransform::Capitalize => {
                let mut out = String::with_capacity(s.len());
                let mut at_word_start = true;
                for ch in s.chars() {
                    if at_word_start && ch.is_alphabetic() {
                        out.extend(ch.to_uppercase());
                        at_word_start = false;
                    } else {
                        out.push(ch);
                        at_word_start = ch.is_whitespace();
                    }
                }
                out
            }
        }
    }
}

/// Horizontal text alignment inside the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    pub content: String,
    pub font_family: String,
    pub font_size: f64,
    #[serde(default = "default_weight")]
    pub font_weight: u16, // 100..900
    #[serde(default)]
    pub decoration: TextDecoration,
    #[serde(default)]
    pub transform: TextTransform,
    /// Multiplier of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub letter_spacing: f64,
    #[serde(default)]
    pub align: TextAlign,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Inter".into(),
            font_size: 16.0,
            font_weight: 400,
            decoration: TextDecoration::None,
            transform: TextTransform::None,
            line_height: 1.2,
            letter_spacing: 0.0,
            align: TextAlign::Left,
        }
    }
}

/// How the segment leaving a path point bends.
/// Coordinates are local to the path element, like the points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Curve {
    Quadratic { cx: f64, cy: f64 },
    Cubic { cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64 },
    /// Quadratic-like handle mirrored into the next segment.
    Smooth { cx: f64, cy: f64 },
}

impl Curve {
    /// The control points of this descriptor.
    pub fn handles(&self) -> SmallVec<[(f64, f64); 2]> {
        match *self {
            Curve::Quadratic { cx, cy } | Curve::Smooth { cx, cy } => smallvec::smallvec![(cx, cy)],
            Curve::Cubic {
                cp1x,
                cp1y,
                cp2x,
                cp2y,
            } => smallvec::smallvec![(cp1x, cp1y), (cp2x, cp2y)],
        }
    }

    /// Apply `f` to every control point.
    pub fn map_points(self, f: impl Fn(f64, f64) -> (f64, f64)) -> Self {
        match self {
            Curve::Quadratic { cx, cy } => {
                let (cx, cy) = f(cx, cy);
                Curve::Quadratic { cx, cy }
            }
            Curve::Smooth { cx, cy } => {
                let (cx, cy) = f(cx, cy);
                Curve::Smooth { cx, cy }
            }
            Curve::Cubic {
                cp1x,
                cp1y,
                cp2x,
                cp2y,
            } => {
                let (cp1x, cp1y) = f(cp1x, cp1y);
                let (cp2x, cp2y) = f(cp2x, cp2y);
                Curve::Cubic {
                    cp1x,
                    cp1y,
                    cp2x,
                    cp2y,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
}

impl PathPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, curve: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEffects {
    #[serde(default)]
    pub blur: f64,
    #[serde(default = "one")]
    pub brightness: f64,
    #[serde(default = "one")]
    pub contrast: f64,
    #[serde(default = "one")]
    pub saturation: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
}

impl Default for ImageEffects {
    fn default() -> Self {
        Self {
            blur: 0.0,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }
}

impl ImageEffects {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// How an image maps into its element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Stretch to the box.
    #[default]
    Fill,
    /// Whole image visible, letterboxed.
    Contain,
    /// Box fully covered, overflow clipped.
    Cover,
    /// Repeat at original size.
    Tile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    pub src: String,
    pub original_width: f64,
    pub original_height: f64,
    pub aspect_ratio: f64,
    /// Per-path color overrides for SVG sources (original color → new color).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_colors: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub effects: ImageEffects,
    #[serde(default)]
    pub fit: ImageFit,
    /// Alignment inside the box for `contain`/`cover`, in unit coordinates.
    #[serde(default = "half")]
    pub align_x: f64,
    #[serde(default = "half")]
    pub align_y: f64,
}

impl ImageProps {
    pub fn new(src: &str, width: f64, height: f64) -> Self {
        let aspect_ratio = if height.abs() > f64::EPSILON {
            width / height
        } else {
            1.0
        };
        Self {
            src: src.to_string(),
            original_width: width,
            original_height: height,
            aspect_ratio,
            svg_colors: None,
            effects: ImageEffects::default(),
            fit: ImageFit::Fill,
            align_x: 0.5,
            align_y: 0.5,
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Variant-specific element data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ElementKind {
    Rect {
        #[serde(default)]
        corner_radius: CornerRadius,
        #[serde(default)]
        blur: f64,
    },
    Ellipse {
        #[serde(default)]
        blur: f64,
    },
    /// Geometric container. Children are found by containment.
    Frame {
        #[serde(default)]
        clip_content: bool,
        #[serde(default)]
        layout: FrameLayout,
    },
    Text(TextProps),
    /// Segment from `(x, y)` to `(x2, y2)`, both in scene coordinates.
    Line { x2: f64, y2: f64 },
    /// Points are local to the element origin.
    Path {
        points: Vec<PathPoint>,
        #[serde(default)]
        closed: bool,
    },
    Image(ImageProps),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Rect { .. } => "rect",
            ElementKind::Ellipse { .. } => "ellipse",
            ElementKind::Frame { .. } => "frame",
            ElementKind::Text(_) => "text",
            ElementKind::Line { .. } => "line",
            ElementKind::Path { .. } => "path",
            ElementKind::Image(_) => "image",
        }
    }

    pub fn rect() -> Self {
        ElementKind::Rect {
            corner_radius: CornerRadius::default(),
            blur: 0.0,
        }
    }

    pub fn ellipse() -> Self {
        ElementKind::Ellipse { blur: 0.0 }
    }

    pub fn frame() -> Self {
        ElementKind::Frame {
            clip_content: true,
            layout: FrameLayout::default(),
        }
    }
}

/// One drawable item on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique, immutable for the element's lifetime.
    pub id: ElementId,

    /// Enclosing frame, recomputed from containment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,

    pub x: f64,
    pub y: f64,
    /// May be negative: a flipped shape, never clamped.
    pub w: f64,
    pub h: f64,

    /// Radians, pivot at the element center.
    #[serde(default)]
    pub rotation: f64,

    #[serde(default)]
    pub fill: Fill,

    #[serde(default = "one")]
    pub opacity: f64,

    #[serde(default = "yes")]
    pub visible: bool,

    #[serde(default)]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,

    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    pub fn new(id: ElementId, kind: ElementKind, x: f64, y: f64, w: f64, h: f64) -> Self {
        let mut element = Self {
            id,
            parent_id: None,
            x,
            y,
            w,
            h,
            rotation: 0.0,
            fill: Fill::default(),
            opacity: 1.0,
            visible: true,
            locked: false,
            stroke: None,
            shadow: None,
            kind,
        };
        if let ElementKind::Line { x2, y2 } = element.kind {
            element.w = x2 - x;
            element.h = y2 - y;
        }
        element
    }

    /// Shorthand for a plain rectangle.
    pub fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(ElementId::intern(id), ElementKind::rect(), x, y, w, h)
    }

    /// Shorthand for a frame with clipping enabled.
    pub fn frame(id: &str, x: f64, y: f64, w: f64, h: f64) -> Self {
        let mut frame = Self::new(ElementId::intern(id), ElementKind::frame(), x, y, w, h);
        frame.fill = Fill::solid("#FFFFFF");
        frame
    }

    /// Shorthand for a path; `w`/`h` are derived from the points.
    pub fn path(id: &str, x: f64, y: f64, points: Vec<PathPoint>, closed: bool) -> Self {
        let mut path = Self::new(
            ElementId::intern(id),
            ElementKind::Path { points, closed },
            x,
            y,
            0.0,
            0.0,
        );
        path.fill = Fill::solid("transparent");
        path.stroke = Some(Stroke::default());
        crate::path::normalize_path(&mut path);
        path
    }

    pub fn is_frame(&self) -> bool {
        matches!(self.kind, ElementKind::Frame { .. })
    }

    pub fn is_path(&self) -> bool {
        matches!(self.kind, ElementKind::Path { .. })
    }

    /// Center of the element box (handles negative sizes).
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Finite, non-degenerate geometry. Invalid elements are skipped by
    /// spatial indexing and island detection.
    pub fn is_spatially_valid(&self) -> bool {
        let finite = [self.x, self.y, self.w, self.h, self.rotation]
            .iter()
            .all(|v| v.is_finite());
        match self.kind {
            // A horizontal or vertical line still has extent along one axis.
            ElementKind::Line { x2, y2 } => {
                finite && x2.is_finite() && y2.is_finite() && (self.w != 0.0 || self.h != 0.0)
            }
            _ => finite && self.w != 0.0 && self.h != 0.0,
        }
    }

    /// Move by `(dx, dy)` in scene units. Lines carry their second endpoint.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let ElementKind::Line { x2, y2 } = &mut self.kind {
            *x2 += dx;
            *y2 += dy;
        }
    }

    /// Re-derive `w`/`h` of a line from its endpoints.
    pub fn sync_line_extent(&mut self) {
        if let ElementKind::Line { x2, y2 } = self.kind {
            self.w = x2 - self.x;
            self.h = y2 - self.y;
        }
    }
}

// ─── Groups ──────────────────────────────────────────────────────────────

/// A selection grouping of at least two elements. Members keep their own
/// parent and z-order; a group is never drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: ElementId,
    pub element_ids: SmallVec<[ElementId; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Group {
    pub fn new(id: ElementId, members: impl IntoIterator<Item = ElementId>) -> Self {
        Self {
            id,
            element_ids: members.into_iter().collect(),
            name: None,
        }
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.element_ids.contains(&id)
    }
}

// ─── serde defaults ──────────────────────────────────────────────────────

fn one() -> f64 {
    1.0
}

fn half() -> f64 {
    0.5
}

fn yes() -> bool {
    true
}

fn default_weight() -> u16 {
    400
}

fn default_line_height() -> f64 {
    1.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_json_shape_is_flat() {
        let el = Element::rect("card", 10.0, 20.0, 100.0, 50.0);
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "rect");
        assert_eq!(json["id"], "card");
        assert_eq!(json["x"], 10.0);
        assert!(json.get("parentId").is_none());
    }

    #[test]
    fn element_json_roundtrip_keeps_variant_fields() {
        let mut el = Element::new(
            ElementId::intern("headline"),
            ElementKind::Text(TextProps {
                content: "Hello".into(),
                font_size: 32.0,
                decoration: TextDecoration::LineThrough,
                ..TextProps::default()
            }),
            0.0,
            0.0,
            200.0,
            40.0,
        );
        el.stroke = Some(Stroke {
            style: StrokeStyle::Dashed,
            position: StrokePosition::Outside,
            ..Stroke::default()
        });
        el.fill = Fill::Gradient(Gradient::Linear {
            angle: 90.0,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: "#000".into(),
                },
                GradientStop {
                    offset: 1.0,
                    color: "#fff".into(),
                },
            ],
        });

        let json = serde_json::to_string(&el).unwrap();
        assert!(json.contains("\"line-through\""));
        assert!(json.contains("\"fontSize\""));
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let json = r#"{"id":"e1","type":"ellipse","x":0,"y":0,"w":10,"h":10}"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert!(el.visible);
        assert_eq!(el.opacity, 1.0);
        assert_eq!(el.kind, ElementKind::Ellipse { blur: 0.0 });
    }

    #[test]
    fn line_translate_moves_both_endpoints() {
        let mut line = Element::new(
            ElementId::intern("ln"),
            ElementKind::Line { x2: 30.0, y2: 40.0 },
            10.0,
            10.0,
            0.0,
            0.0,
        );
        assert_eq!((line.w, line.h), (20.0, 30.0));
        line.translate(5.0, 5.0);
        assert_eq!(line.kind, ElementKind::Line { x2: 35.0, y2: 45.0 });
        assert_eq!((line.x, line.y), (15.0, 15.0));
    }

    #[test]
    fn validity_rejects_nan_and_zero_size() {
        let mut el = Element::rect("v", 0.0, 0.0, 10.0, 10.0);
        assert!(el.is_spatially_valid());
        el.w = f64::NAN;
        assert!(!el.is_spatially_valid());
        el.w = 0.0;
        assert!(!el.is_spatially_valid());
        el.w = -5.0;
        assert!(el.is_spatially_valid(), "flipped shapes are valid");
    }

    #[test]
    fn capitalize_transform() {
        assert_eq!(TextTransform::Capitalize.apply("hello big world"), "Hello Big World");
        assert_eq!(TextTransform::Uppercase.apply("abc"), "ABC");
    }
}
