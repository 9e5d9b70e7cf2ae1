//! Frame renderer: scene → [`Surface`] calls.
//!
//! One frame is: clear, apply device pixel ratio and camera, draw the visible
//! elements bottom to top, then the selection affordances, the box-selection
//! rectangle and smart guides on top. Each element goes through the same
//! passes: drop shadow, fill, inner shadow, stroke.

use crate::fonts::FontRegistry;
use crate::hit::{Handle, handle_rect};
use crate::images::{ImageCache, ImageState, placements, resolved_source};
use crate::surface::{
    ClipMode, ColorStop, ImageDraw, Layer, LineCap, LineJoin, Paint, PathData, StrokeSpec, Surface,
    TextRun,
};
use clise_core::geometry::normalized_box;
use clise_core::model::{
    BlendMode, Element, ElementKind, Fill, Gradient, GradientStop, ImageProps, Shadow, ShadowKind,
    Stroke, StrokePosition, StrokeStyle, TextAlign, TextDecoration, TextProps,
};
use clise_core::path::{Segment, segments};
use clise_core::spatial::MIN_CELL_SIZE;
use clise_core::{
    Bounds, Color, ElementId, Point, Scene, SpatialGrid, Viewport, element_bounds, export_bounds,
    parse_color,
};
use serde::{Deserialize, Serialize};

/// Share of the font size above the baseline.
const ASCENT: f64 = 0.8;

// ─── Options & frame data ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Skip elements outside the visible rectangle.
    pub culling: bool,
    /// Merge consecutive plain shapes that share a solid fill into one call.
    pub batching: bool,
    /// Find visible elements through a spatial grid instead of a scan.
    pub spatial_index: bool,
    /// Resize handle edge, in screen pixels.
    pub handle_size: f64,
    pub background: String,
    pub selection_color: String,
    pub guide_color: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            culling: true,
            batching: true,
            spatial_index: true,
            handle_size: 8.0,
            background: "#F5F5F5".into(),
            selection_color: "#0D99FF".into(),
            guide_color: "#FF3B8B".into(),
        }
    }
}

/// A smart-guide segment in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub from: Point,
    pub to: Point,
}

pub struct FrameInput<'a> {
    pub scene: &'a Scene,
    pub viewport: &'a Viewport,
    /// Canvas size in CSS pixels.
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
    /// Live box-selection rectangle, scene coordinates.
    pub box_select: Option<Bounds>,
    pub guides: &'a [Guide],
    /// Text element under an inline editor; drawn by the host instead.
    pub editing: Option<ElementId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub culled: usize,
    /// Fill calls that carried merged shapes.
    pub batches: usize,
}

// ─── Renderer ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Renderer {
    options: RenderOptions,
    fonts: FontRegistry,
    images: ImageCache,
    grid: Option<(u64, usize, SpatialGrid)>,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn fonts(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }

    pub fn images(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    /// Whether a font load or image decode finished since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        let fonts = self.fonts.take_redraw_request();
        let images = self.images.take_redraw_request();
        fonts || images
    }

    pub fn render(&mut self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> FrameStats {
        let mut stats = FrameStats::default();
        let vp = frame.viewport;

        surface.clear(parse_color(&self.options.background).unwrap_or(Color::WHITE));
        surface.save();
        surface.scale(frame.dpr, frame.dpr);
        surface.translate(vp.pan.x, vp.pan.y);
        surface.scale(vp.zoom, vp.zoom);

        let visible = vp.visible_rect(frame.width, frame.height);
        let candidates = self.visible_indices(frame.scene, &visible);
        let elements = frame.scene.elements();
        let visible_total = elements.iter().filter(|e| e.visible).count();

        let mut batch: Option<(Color, PathData)> = None;
        for index in candidates {
            let el = &elements[index];
            if !el.visible || frame.editing == Some(el.id) {
                continue;
            }
            stats.drawn += 1;
            let clips = clip_chain(frame.scene, el);

            if self.options.batching
                && clips.is_empty()
                && let Some(color) = batch_color(el)
            {
                if let Some((c, path)) = &mut batch
                    && *c == color
                {
                    path.extend(&outline(el));
                } else {
                    flush(surface, &mut batch, &mut stats);
                    batch = Some((color, outline(el)));
                }
                continue;
            }

            flush(surface, &mut batch, &mut stats);
            if clips.is_empty() {
                self.draw_element(surface, el);
            } else {
                surface.save();
                for frame_el in clips.iter().rev() {
                    with_rotation(surface, frame_el, |s| s.clip(&outline(frame_el), ClipMode::Intersect));
                }
                self.draw_element(surface, el);
                surface.restore();
            }
        }
        flush(surface, &mut batch, &mut stats);
        stats.culled = visible_total.saturating_sub(stats.drawn);

        self.draw_selection(surface, frame);
        if let Some(rect) = frame.box_select {
            self.draw_box_select(surface, &rect, vp.zoom);
        }
        self.draw_guides(surface, frame.guides, vp.zoom);
        surface.restore();

        log::trace!(
            "frame: drawn={} culled={} batches={}",
            stats.drawn,
            stats.culled,
            stats.batches
        );
        stats
    }

    fn visible_indices(&mut self, scene: &Scene, visible: &Bounds) -> Vec<usize> {
        let elements = scene.elements();
        if !self.options.culling {
            return (0..elements.len()).collect();
        }
        if !self.options.spatial_index {
            return elements
                .iter()
                .enumerate()
                .filter(|(_, el)| export_bounds(el).intersects(visible))
                .map(|(i, _)| i)
                .collect();
        }

        let stale = !matches!(
            &self.grid,
            Some((version, len, _)) if *version == scene.version() && *len == elements.len()
        );
        if stale {
            let mut grid = SpatialGrid::new(MIN_CELL_SIZE);
            for (i, el) in elements.iter().enumerate() {
                grid.insert(i, export_bounds(el));
            }
            log::trace!("render: rebuilt grid for version {}", scene.version());
            self.grid = Some((scene.version(), elements.len(), grid));
        }
        match &self.grid {
            Some((_, _, grid)) => grid.query_rect(visible),
            None => Vec::new(),
        }
    }

    // ─── Elements ────────────────────────────────────────────────────────

    fn draw_element(&mut self, surface: &mut dyn Surface, el: &Element) {
        if el.opacity <= 0.0 {
            return;
        }
        let layer = element_layer(el);
        surface.save();
        if el.rotation != 0.0 {
            let (cx, cy) = el.center();
            surface.translate(cx, cy);
            surface.rotate(el.rotation);
            surface.translate(-cx, -cy);
        }
        if let Some(layer) = &layer {
            surface.push_layer(layer);
        }

        match &el.kind {
            ElementKind::Text(props) => self.draw_text(surface, el, props),
            ElementKind::Image(props) => {
                if let Some(shadow) = el.shadow.as_ref().filter(|s| s.kind == ShadowKind::Drop) {
                    drop_shadow(surface, el, shadow);
                }
                self.draw_image(surface, el, props);
                if let Some(stroke) = &el.stroke {
                    draw_stroke(surface, el, &outline(el), stroke);
                }
            }
            _ => draw_shape(surface, el),
        }

        if layer.is_some() {
            surface.pop_layer();
        }
        surface.restore();
    }

    fn draw_text(&mut self, surface: &mut dyn Surface, el: &Element, props: &TextProps) {
        let color = text_color(&el.fill);
        let runs = self.text_runs(el, props, color);

        if let Some(shadow) = el.shadow.as_ref().filter(|s| s.kind == ShadowKind::Drop)
            && let Some(shadow_color) = shadow_color(shadow)
        {
            surface.push_layer(&Layer::blur(shadow.blur));
            surface.save();
            surface.translate(shadow.offset_x, shadow.offset_y);
            for run in &runs {
                surface.fill_text(&TextRun {
                    color: shadow_color,
                    ..run.clone()
                });
            }
            surface.restore();
            surface.pop_layer();
        }

        for run in &runs {
            surface.fill_text(run);
            if props.decoration != TextDecoration::None {
                let width = surface.measure_text(run);
                let left = match run.align {
                    TextAlign::Left => run.x,
                    TextAlign::Center => run.x - width / 2.0,
                    TextAlign::Right => run.x - width,
                };
                let thickness = (run.size / 16.0).max(1.0);
                let y = match props.decoration {
                    TextDecoration::Underline => run.baseline + run.size * 0.1,
                    _ => run.baseline - run.size * 0.3,
                };
                surface.fill_path(
                    &PathData::rect(&Bounds::new(left, y, width, thickness)),
                    &Paint::Solid(run.color),
                );
            }
        }
    }

    /// One run per line of the transformed content.
    fn text_runs(&mut self, el: &Element, props: &TextProps, color: Color) -> Vec<TextRun> {
        let font = self
            .fonts
            .resolve(&props.font_family, props.font_size, props.font_weight);
        let b = normalized_box(el);
        let step = props.font_size * props.line_height;
        let x = match props.align {
            TextAlign::Left => b.x,
            TextAlign::Center => b.center().x,
            TextAlign::Right => b.max_x(),
        };
        props
            .transform
            .apply(&props.content)
            .split('\n')
            .enumerate()
            .map(|(i, line)| TextRun {
                text: line.to_string(),
                x,
                baseline: b.y + step * i as f64 + (step - props.font_size) / 2.0
                    + props.font_size * ASCENT,
                family: font.family.clone(),
                size: font.size,
                weight: font.weight,
                letter_spacing: props.letter_spacing,
                align: props.align,
                color,
            })
            .collect()
    }

    fn draw_image(&mut self, surface: &mut dyn Surface, el: &Element, props: &ImageProps) {
        let b = normalized_box(el);
        let key = resolved_source(props);
        let state = self.images.request(&key).clone();
        let ImageState::Ready(bitmap) = state else {
            draw_placeholder(surface, &b, matches!(state, ImageState::Failed));
            return;
        };

        surface.save();
        surface.clip(&PathData::rect(&b), ClipMode::Intersect);
        // Negative sizes mirror the bitmap.
        if el.w < 0.0 || el.h < 0.0 {
            let c = b.center();
            surface.translate(c.x, c.y);
            surface.scale(el.w.signum(), el.h.signum());
            surface.translate(-c.x, -c.y);
        }
        for (dest, src) in placements(props, &b, bitmap.width, bitmap.height) {
            surface.draw_image(
                &bitmap,
                &ImageDraw {
                    dest,
                    src,
                    effects: props.effects,
                },
            );
        }
        surface.restore();
    }

    // ─── Overlays ────────────────────────────────────────────────────────

    fn draw_selection(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        let scene = frame.scene;
        let zoom = frame.viewport.zoom;
        let color = parse_color(&self.options.selection_color).unwrap_or(Color::BLACK);
        let paint = Paint::Solid(color);
        let thin = StrokeSpec::solid(1.0 / zoom);

        for id in scene.selection() {
            let (bounds, locked) = if let Some(group) = scene.group(*id) {
                let member_bounds: Vec<Bounds> = group
                    .element_ids
                    .iter()
                    .filter_map(|m| scene.get(*m))
                    .map(element_bounds)
                    .collect();
                let Some(b) = Bounds::union_all(&member_bounds) else {
                    continue;
                };
                for mb in &member_bounds {
                    surface.stroke_path(&PathData::rect(mb), &paint, &thin);
                }
                let dash = 4.0 / zoom;
                surface.stroke_path(
                    &PathData::rect(&b),
                    &paint,
                    &StrokeSpec::dashed(1.0 / zoom, dash, dash),
                );
                (b, false)
            } else if let Some(el) = scene.get(*id) {
                let b = element_bounds(el);
                surface.stroke_path(&PathData::rect(&b), &paint, &thin);
                (b, el.locked)
            } else {
                continue;
            };

            if locked {
                continue;
            }
            for handle in Handle::ALL {
                let r = PathData::rect(&handle_rect(handle, &bounds, self.options.handle_size, zoom));
                surface.fill_path(&r, &Paint::Solid(Color::WHITE));
                surface.stroke_path(&r, &paint, &thin);
            }
        }
    }

    fn draw_box_select(&self, surface: &mut dyn Surface, rect: &Bounds, zoom: f64) {
        let color = parse_color(&self.options.selection_color).unwrap_or(Color::BLACK);
        let path = PathData::rect(rect);
        surface.fill_path(&path, &Paint::Solid(color.with_alpha_factor(0.1)));
        surface.stroke_path(&path, &Paint::Solid(color), &StrokeSpec::solid(1.0 / zoom));
    }

    fn draw_guides(&self, surface: &mut dyn Surface, guides: &[Guide], zoom: f64) {
        if guides.is_empty() {
            return;
        }
        let color = parse_color(&self.options.guide_color).unwrap_or(Color::BLACK);
        let spec = StrokeSpec::solid(1.0 / zoom);
        for g in guides {
            surface.stroke_path(&PathData::line(g.from, g.to), &Paint::Solid(color), &spec);
        }
    }
}

// ─── Batching & clipping ─────────────────────────────────────────────────

fn flush(surface: &mut dyn Surface, batch: &mut Option<(Color, PathData)>, stats: &mut FrameStats) {
    if let Some((color, path)) = batch.take() {
        surface.fill_path(&path, &Paint::Solid(color));
        stats.batches += 1;
    }
}

/// The solid color a plain shape can be merged under, if it qualifies.
fn batch_color(el: &Element) -> Option<Color> {
    let plain_kind = match el.kind {
        ElementKind::Rect { blur, .. } | ElementKind::Ellipse { blur } => blur == 0.0,
        ElementKind::Frame { .. } => true,
        _ => false,
    };
    if !plain_kind
        || el.rotation != 0.0
        || el.opacity < 1.0
        || el.shadow.is_some()
        || el.stroke.is_some()
    {
        return None;
    }
    match &el.fill {
        // Overlapping translucent shapes blend per shape; one merged path
        // would only blend once where they overlap.
        Fill::Solid(s) => parse_color(s).filter(|c| c.a >= 1.0),
        Fill::Gradient(_) => None,
    }
}

/// Clipping frames enclosing `el`, innermost first.
fn clip_chain<'a>(scene: &'a Scene, el: &Element) -> Vec<&'a Element> {
    let mut out = Vec::new();
    let mut cursor = el.parent_id;
    while let Some(parent) = cursor.and_then(|id| scene.get(id)) {
        if out.len() > scene.len() {
            break;
        }
        if let ElementKind::Frame {
            clip_content: true, ..
        } = parent.kind
        {
            out.push(parent);
        }
        cursor = parent.parent_id;
    }
    out
}

fn with_rotation(surface: &mut dyn Surface, el: &Element, f: impl FnOnce(&mut dyn Surface)) {
    if el.rotation == 0.0 {
        f(surface);
        return;
    }
    let (cx, cy) = el.center();
    surface.translate(cx, cy);
    surface.rotate(el.rotation);
    surface.translate(-cx, -cy);
    f(surface);
    surface.translate(cx, cy);
    surface.rotate(-el.rotation);
    surface.translate(-cx, -cy);
}

fn element_layer(el: &Element) -> Option<Layer> {
    let (blur, blend) = match &el.kind {
        ElementKind::Rect { blur, .. } | ElementKind::Ellipse { blur } => (*blur, BlendMode::Normal),
        ElementKind::Image(props) => (props.effects.blur, props.effects.blend_mode),
        _ => (0.0, BlendMode::Normal),
    };
    let opacity = el.opacity.clamp(0.0, 1.0) as f32;
    (opacity < 1.0 || blur > 0.0 || blend != BlendMode::Normal).then_some(Layer {
        opacity,
        blur,
        blend,
    })
}

// ─── Shapes ──────────────────────────────────────────────────────────────

fn is_closed(el: &Element) -> bool {
    match &el.kind {
        ElementKind::Line { .. } => false,
        ElementKind::Path { closed, .. } => *closed,
        _ => true,
    }
}

/// The element's outline in scene coordinates, before rotation.
pub fn outline(el: &Element) -> PathData {
    outline_in(el, &normalized_box(el))
}

/// Like [`outline`], with box-shaped kinds laid out in `b`.
fn outline_in(el: &Element, b: &Bounds) -> PathData {
    match &el.kind {
        ElementKind::Rect { corner_radius, .. } => PathData::rounded_rect(
            b,
            [
                corner_radius.top_left,
                corner_radius.top_right,
                corner_radius.bottom_right,
                corner_radius.bottom_left,
            ],
        ),
        ElementKind::Ellipse { .. } => PathData::ellipse(b),
        ElementKind::Line { x2, y2 } => PathData::line(Point::new(el.x, el.y), Point::new(*x2, *y2)),
        ElementKind::Path { points, closed } => {
            let mut path = PathData::new();
            let Some(first) = points.first() else {
                return path;
            };
            let at = |p: Point| Point::new(el.x + p.x, el.y + p.y);
            path.move_to(at(Point::new(first.x, first.y)));
            for seg in segments(points, *closed) {
                match seg {
                    Segment::Line { to } => path.line_to(at(to)),
                    Segment::Quad { ctrl, to } => path.quad_to(at(ctrl), at(to)),
                    Segment::Cubic { c1, c2, to } => path.cubic_to(at(c1), at(c2), at(to)),
                }
            }
            if *closed {
                path.close();
            }
            path
        }
        ElementKind::Frame { .. } | ElementKind::Text(_) | ElementKind::Image(_) => PathData::rect(b),
    }
}

fn draw_shape(surface: &mut dyn Surface, el: &Element) {
    let shape = outline(el);
    let closed = is_closed(el);

    if let Some(shadow) = el.shadow.as_ref().filter(|s| s.kind == ShadowKind::Drop) {
        drop_shadow(surface, el, shadow);
    }
    if closed {
        draw_fill(surface, el, &shape);
    }
    if closed && let Some(shadow) = el.shadow.as_ref().filter(|s| s.kind == ShadowKind::Inner) {
        inner_shadow(surface, el, &shape, shadow);
    }
    if let Some(stroke) = &el.stroke {
        draw_stroke(surface, el, &shape, stroke);
    }
}

fn draw_fill(surface: &mut dyn Surface, el: &Element, shape: &PathData) {
    let b = normalized_box(el);
    match &el.fill {
        Fill::Gradient(Gradient::Mesh { rows, cols, colors }) => {
            draw_mesh(surface, shape, &b, *rows, *cols, colors)
        }
        fill => {
            if let Some(paint) = paint_for(fill, &b) {
                surface.fill_path(shape, &paint);
            }
        }
    }
}

/// Mesh gradients render as a grid of flat cells clipped to the shape.
fn draw_mesh(surface: &mut dyn Surface, shape: &PathData, b: &Bounds, rows: u32, cols: u32, colors: &[String]) {
    if rows == 0 || cols == 0 {
        return;
    }
    let (cw, ch) = (b.width / cols as f64, b.height / rows as f64);
    surface.save();
    surface.clip(shape, ClipMode::Intersect);
    for r in 0..rows {
        for c in 0..cols {
            let Some(color) = colors
                .get((r * cols + c) as usize)
                .and_then(|s| parse_color(s))
            else {
                continue;
            };
            let cell = Bounds::new(b.x + cw * c as f64, b.y + ch * r as f64, cw, ch);
            surface.fill_path(&PathData::rect(&cell), &Paint::Solid(color));
        }
    }
    surface.restore();
}

fn draw_stroke(surface: &mut dyn Surface, el: &Element, shape: &PathData, stroke: &Stroke) {
    if stroke.width <= 0.0 {
        return;
    }
    let Some(paint) = paint_for(&stroke.paint, &normalized_box(el)) else {
        return;
    };
    let paint = paint.with_alpha_factor(stroke.opacity as f32);
    let closed = is_closed(el);

    let spec = |width: f64| {
        let mut spec = match stroke.style {
            StrokeStyle::Solid => StrokeSpec::solid(width),
            StrokeStyle::Dashed => {
                StrokeSpec::dashed(width, (stroke.width * 4.0).max(4.0), (stroke.width * 2.0).max(2.0))
            }
        };
        if !closed {
            spec.cap = LineCap::Round;
            spec.join = LineJoin::Round;
        }
        spec
    };

    match (closed, stroke.position) {
        (false, _) | (true, StrokePosition::Center) => {
            surface.stroke_path(shape, &paint, &spec(stroke.width));
        }
        // Double width, half of it clipped away.
        (true, StrokePosition::Inside) => {
            surface.save();
            surface.clip(shape, ClipMode::Intersect);
            surface.stroke_path(shape, &paint, &spec(stroke.width * 2.0));
            surface.restore();
        }
        (true, StrokePosition::Outside) => {
            surface.save();
            surface.clip(shape, ClipMode::Difference);
            surface.stroke_path(shape, &paint, &spec(stroke.width * 2.0));
            surface.restore();
        }
    }
}

fn shadow_color(shadow: &Shadow) -> Option<Color> {
    match parse_color(&shadow.color) {
        Some(c) => Some(c.with_alpha_factor(shadow.opacity as f32)),
        None => {
            log::warn!("render: unreadable shadow color {:?}", shadow.color);
            None
        }
    }
}

fn drop_shadow(surface: &mut dyn Surface, el: &Element, shadow: &Shadow) {
    let Some(color) = shadow_color(shadow) else {
        return;
    };
    let spread_box = normalized_box(el).inflate(shadow.spread);
    let shape = outline_in(el, &spread_box).translated(shadow.offset_x, shadow.offset_y);

    surface.push_layer(&Layer::blur(shadow.blur));
    if is_closed(el) {
        surface.fill_path(&shape, &Paint::Solid(color));
    } else {
        let width = el.stroke.as_ref().map(|s| s.width).unwrap_or(1.0);
        surface.stroke_path(&shape, &Paint::Solid(color), &StrokeSpec::solid(width));
    }
    surface.pop_layer();
}

fn inner_shadow(surface: &mut dyn Surface, el: &Element, shape: &PathData, shadow: &Shadow) {
    let Some(color) = shadow_color(shadow) else {
        return;
    };
    let reach = shadow.blur + shadow.spread.abs() + shadow.offset_x.abs() + shadow.offset_y.abs();
    let outer = normalized_box(el).inflate(reach + 1.0);
    let hole = outline_in(el, &normalized_box(el).inflate(-shadow.spread))
        .translated(shadow.offset_x, shadow.offset_y);

    surface.save();
    surface.clip(shape, ClipMode::Intersect);
    surface.push_layer(&Layer::blur(shadow.blur));
    surface.save();
    surface.clip(&hole, ClipMode::Difference);
    surface.fill_path(&PathData::rect(&outer), &Paint::Solid(color));
    surface.restore();
    surface.pop_layer();
    surface.restore();
}

fn draw_placeholder(surface: &mut dyn Surface, b: &Bounds, failed: bool) {
    let gray = Color::rgba8(0xE5, 0xE5, 0xE5, 0xFF);
    surface.fill_path(&PathData::rect(b), &Paint::Solid(gray));
    if failed {
        let mut cross = PathData::line(Point::new(b.x, b.y), Point::new(b.max_x(), b.max_y()));
        cross.extend(&PathData::line(Point::new(b.max_x(), b.y), Point::new(b.x, b.max_y())));
        surface.stroke_path(
            &cross,
            &Paint::Solid(Color::rgba8(0x99, 0x99, 0x99, 0xFF)),
            &StrokeSpec::solid(1.0),
        );
    }
}

// ─── Paint conversion ────────────────────────────────────────────────────

fn stops_of(stops: &[GradientStop]) -> Vec<ColorStop> {
    stops
        .iter()
        .filter_map(|s| {
            parse_color(&s.color).map(|color| ColorStop {
                offset: s.offset.clamp(0.0, 1.0),
                color,
            })
        })
        .collect()
}

/// Surface paint for a fill over box `b`. `None` when nothing would show.
pub fn paint_for(fill: &Fill, b: &Bounds) -> Option<Paint> {
    let paint = match fill {
        Fill::Solid(s) => Paint::Solid(parse_color(s)?),
        Fill::Gradient(Gradient::Linear { angle, stops }) => {
            let (sin, cos) = angle.to_radians().sin_cos();
            let half = (b.width * cos).abs() / 2.0 + (b.height * sin).abs() / 2.0;
            let c = b.center();
            Paint::Linear {
                start: Point::new(c.x - cos * half, c.y - sin * half),
                end: Point::new(c.x + cos * half, c.y + sin * half),
                stops: stops_of(stops),
            }
        }
        Fill::Gradient(Gradient::Radial {
            cx,
            cy,
            radius,
            stops,
        }) => Paint::Radial {
            center: Point::new(b.x + b.width * cx, b.y + b.height * cy),
            radius: radius * b.width.min(b.height),
            stops: stops_of(stops),
        },
        // Averaged; shapes draw meshes cell by cell instead.
        Fill::Gradient(Gradient::Mesh { colors, .. }) => {
            let parsed: Vec<Color> = colors.iter().filter_map(|c| parse_color(c)).collect();
            let n = parsed.len() as f32;
            if n == 0.0 {
                return None;
            }
            let sum = parsed.iter().fold([0.0f32; 4], |acc, c| {
                [acc[0] + c.r, acc[1] + c.g, acc[2] + c.b, acc[3] + c.a]
            });
            Paint::Solid(Color::rgba(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n))
        }
    };
    (!paint.is_invisible()).then_some(paint)
}

fn text_color(fill: &Fill) -> Color {
    let color = match fill {
        Fill::Solid(s) => parse_color(s),
        Fill::Gradient(Gradient::Linear { stops, .. } | Gradient::Radial { stops, .. }) => {
            stops.first().and_then(|s| parse_color(&s.color))
        }
        Fill::Gradient(Gradient::Mesh { colors, .. }) => colors.first().and_then(|c| parse_color(c)),
    };
    color.unwrap_or(Color::BLACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawOp, RecordingSurface};
    use clise_core::model::CornerRadius;
    use pretty_assertions::assert_eq;

    fn frame<'a>(scene: &'a Scene, viewport: &'a Viewport) -> FrameInput<'a> {
        FrameInput {
            scene,
            viewport,
            width: 800.0,
            height: 600.0,
            dpr: 1.0,
            box_select: None,
            guides: &[],
            editing: None,
        }
    }

    fn solid(el: Element, color: &str) -> Element {
        Element {
            fill: Fill::solid(color),
            ..el
        }
    }

    #[test]
    fn consecutive_same_color_shapes_share_one_fill() {
        let scene = Scene::from_parts(
            vec![
                solid(Element::rect("rn_a", 0.0, 0.0, 10.0, 10.0), "#FF0000"),
                solid(Element::rect("rn_b", 20.0, 0.0, 10.0, 10.0), "#FF0000"),
                solid(Element::rect("rn_c", 40.0, 0.0, 10.0, 10.0), "#00FF00"),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let vp = Viewport::default();
        let mut surface = RecordingSurface::new();
        let stats = Renderer::default().render(&mut surface, &frame(&scene, &vp));

        assert_eq!(stats, FrameStats { drawn: 3, culled: 0, batches: 2 });
        assert_eq!(surface.fills().count(), 2);
    }

    #[test]
    fn batching_off_draws_each_shape() {
        let scene = Scene::from_parts(
            vec![
                Element::rect("rn_d", 0.0, 0.0, 10.0, 10.0),
                Element::rect("rn_e", 20.0, 0.0, 10.0, 10.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let vp = Viewport::default();
        let mut renderer = Renderer::new(RenderOptions {
            batching: false,
            ..RenderOptions::default()
        });
        let mut surface = RecordingSurface::new();
        let stats = renderer.render(&mut surface, &frame(&scene, &vp));
        assert_eq!(stats.batches, 0);
        assert_eq!(surface.fills().count(), 2);
    }

    #[test]
    fn overlapping_translucent_shapes_draw_alike_with_and_without_batching() {
        let scene = Scene::from_parts(
            vec![
                solid(Element::rect("rn_t1", 0.0, 0.0, 40.0, 40.0), "rgba(255, 0, 0, 0.5)"),
                solid(Element::rect("rn_t2", 20.0, 20.0, 40.0, 40.0), "rgba(255, 0, 0, 0.5)"),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let vp = Viewport::default();
        let draw = |batching| {
            let mut renderer = Renderer::new(RenderOptions {
                batching,
                ..RenderOptions::default()
            });
            let mut surface = RecordingSurface::new();
            let stats = renderer.render(&mut surface, &frame(&scene, &vp));
            (stats, surface.ops)
        };
        let (batched_stats, batched) = draw(true);
        let (plain_stats, plain) = draw(false);

        assert_eq!(batched_stats.batches, 0);
        assert_eq!(batched_stats.drawn, plain_stats.drawn);
        assert_eq!(batched, plain);
    }

    #[test]
    fn offscreen_elements_are_culled_with_and_without_the_grid() {
        let scene = Scene::from_parts(
            vec![
                Element::rect("rn_on", 10.0, 10.0, 10.0, 10.0),
                Element::rect("rn_off", 5000.0, 5000.0, 10.0, 10.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let vp = Viewport::default();
        for spatial_index in [true, false] {
            let mut renderer = Renderer::new(RenderOptions {
                spatial_index,
                ..RenderOptions::default()
            });
            let stats = renderer.render(&mut RecordingSurface::new(), &frame(&scene, &vp));
            assert_eq!((stats.drawn, stats.culled), (1, 1));
        }
        let mut no_cull = Renderer::new(RenderOptions {
            culling: false,
            ..RenderOptions::default()
        });
        let stats = no_cull.render(&mut RecordingSurface::new(), &frame(&scene, &vp));
        assert_eq!((stats.drawn, stats.culled), (2, 0));
    }

    #[test]
    fn camera_transform_precedes_drawing() {
        let scene = Scene::new();
        let vp = Viewport::new(Point::new(30.0, 40.0), 2.0);
        let mut surface = RecordingSurface::new();
        let input = FrameInput {
            dpr: 2.0,
            ..frame(&scene, &vp)
        };
        Renderer::default().render(&mut surface, &input);
        assert_eq!(
            &surface.ops[1..5],
            &[
                DrawOp::Save,
                DrawOp::Scale(2.0, 2.0),
                DrawOp::Translate(30.0, 40.0),
                DrawOp::Scale(2.0, 2.0),
            ]
        );
        assert_eq!(surface.ops.last(), Some(&DrawOp::Restore));
    }

    #[test]
    fn inside_stroke_is_clipped_to_the_shape() {
        let mut el = Element::rect("rn_stroke", 0.0, 0.0, 50.0, 50.0);
        el.stroke = Some(Stroke {
            width: 4.0,
            position: StrokePosition::Inside,
            ..Stroke::default()
        });
        let scene = Scene::from_parts(vec![el], vec![], vec![]).unwrap();
        let vp = Viewport::default();
        let mut surface = RecordingSurface::new();
        Renderer::default().render(&mut surface, &frame(&scene, &vp));

        let clip_at = surface
            .ops
            .iter()
            .position(|op| matches!(op, DrawOp::Clip { mode: ClipMode::Intersect, .. }))
            .expect("clip");
        let DrawOp::Stroke { stroke, .. } = &surface.ops[clip_at + 1] else {
            panic!("stroke should follow the clip")
        };
        assert_eq!(stroke.width, 8.0);
    }

    #[test]
    fn clip_content_frames_clip_their_children() {
        let frame_el = Element::frame("rn_frame", 0.0, 0.0, 100.0, 100.0);
        let mut child = Element::rect("rn_child", 50.0, 50.0, 100.0, 100.0);
        child.parent_id = Some(ElementId::intern("rn_frame"));
        let scene = Scene::from_parts(vec![frame_el, child], vec![], vec![]).unwrap();
        let vp = Viewport::default();
        let mut surface = RecordingSurface::new();
        Renderer::default().render(&mut surface, &frame(&scene, &vp));

        let frame_rect = PathData::rect(&Bounds::new(0.0, 0.0, 100.0, 100.0));
        assert!(surface.ops.contains(&DrawOp::Clip {
            path: frame_rect,
            mode: ClipMode::Intersect,
        }));
    }

    #[test]
    fn selection_draws_eight_handles_unless_locked() {
        let mut locked = Element::rect("rn_locked", 200.0, 0.0, 10.0, 10.0);
        locked.locked = true;
        let scene = Scene::from_parts(
            vec![Element::rect("rn_sel", 0.0, 0.0, 10.0, 10.0), locked],
            vec![],
            vec![ElementId::intern("rn_sel"), ElementId::intern("rn_locked")],
        )
        .unwrap();
        let vp = Viewport::default();
        let mut surface = RecordingSurface::new();
        Renderer::default().render(&mut surface, &frame(&scene, &vp));
        let white = surface
            .fills()
            .filter(|(_, p)| **p == Paint::Solid(Color::WHITE))
            .count();
        assert_eq!(white, 8);
    }

    #[test]
    fn pending_image_draws_placeholder_and_queues_decode() {
        let el = Element::new(
            ElementId::intern("rn_img"),
            ElementKind::Image(ImageProps::new("cat.png", 40.0, 20.0)),
            0.0,
            0.0,
            40.0,
            20.0,
        );
        let scene = Scene::from_parts(vec![el], vec![], vec![]).unwrap();
        let vp = Viewport::default();
        let mut renderer = Renderer::default();
        let mut surface = RecordingSurface::new();
        renderer.render(&mut surface, &frame(&scene, &vp));
        assert_eq!(renderer.images().take_requests(), vec!["cat.png".to_string()]);
        assert_eq!(surface.count(|op| matches!(op, DrawOp::Image { .. })), 0);

        let bitmap = crate::images::Bitmap::new(2, 1, vec![0; 8]).unwrap();
        renderer.images().complete("cat.png", bitmap);
        assert!(renderer.take_redraw_request());
        let mut surface = RecordingSurface::new();
        renderer.render(&mut surface, &frame(&scene, &vp));
        assert_eq!(surface.count(|op| matches!(op, DrawOp::Image { .. })), 1);
    }

    #[test]
    fn text_lines_follow_transform_and_alignment() {
        let props = TextProps {
            content: "hello\nworld".into(),
            transform: clise_core::model::TextTransform::Uppercase,
            align: TextAlign::Right,
            ..TextProps::default()
        };
        let mut el = Element::new(
            ElementId::intern("rn_text"),
            ElementKind::Text(props),
            10.0,
            10.0,
            100.0,
            40.0,
        );
        el.fill = Fill::solid("#112233");
        let scene = Scene::from_parts(vec![el], vec![], vec![]).unwrap();
        let vp = Viewport::default();
        let mut surface = RecordingSurface::new();
        Renderer::default().render(&mut surface, &frame(&scene, &vp));

        let runs: Vec<&TextRun> = surface.texts().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "HELLO");
        assert_eq!(runs[1].x, 110.0);
        assert!(runs[1].baseline > runs[0].baseline);
        assert_eq!(runs[0].family, crate::fonts::DEFAULT_FALLBACK);
    }

    #[test]
    fn linear_gradient_spans_the_box_along_its_angle() {
        let fill = Fill::Gradient(Gradient::Linear {
            angle: 0.0,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: "#000000".into(),
                },
                GradientStop {
                    offset: 1.0,
                    color: "#FFFFFF".into(),
                },
            ],
        });
        let Some(Paint::Linear { start, end, stops }) =
            paint_for(&fill, &Bounds::new(0.0, 0.0, 100.0, 50.0))
        else {
            panic!("expected a linear paint")
        };
        assert_eq!((start, end), (Point::new(0.0, 25.0), Point::new(100.0, 25.0)));
        assert_eq!(stops.len(), 2);
    }

    #[test]
    fn transparent_fills_produce_no_paint() {
        let b = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(paint_for(&Fill::solid("transparent"), &b), None);
        assert_eq!(paint_for(&Fill::solid("not a color"), &b), None);
    }

    #[test]
    fn rounded_rect_outline_uses_corner_radius() {
        let mut el = Element::rect("rn_round", 0.0, 0.0, 40.0, 40.0);
        el.kind = ElementKind::Rect {
            corner_radius: CornerRadius::uniform(8.0),
            blur: 0.0,
        };
        assert_ne!(outline(&el), PathData::rect(&Bounds::new(0.0, 0.0, 40.0, 40.0)));
    }
}
