//! Canvas2D surface.
//!
//! Implements [`Surface`] over a `CanvasRenderingContext2d` so the shared
//! renderer can draw straight into an HTML `<canvas>`. Canvas2D has no real
//! offscreen layers, so a layer is emulated with `save`/`restore` around a
//! multiplied global alpha, a composite operation and a CSS blur filter.

use clise_core::Color;
use clise_core::model::{ImageEffects, TextAlign};
use clise_render::images::Bitmap;
use clise_render::surface::{
    ClipMode, ImageDraw, Layer, LineCap, LineJoin, PathCmd, PathData, Paint, StrokeSpec, TextRun,
    blend_css,
};
use clise_render::Surface;
use std::collections::HashMap;
use std::sync::Arc;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, ImageData};

/// Larger than any canvas; used to invert a clip with even-odd filling.
const CLIP_EXTENT: f64 = 1.0e7;

/// Log a failed context call instead of aborting the frame.
fn check(result: Result<(), JsValue>, what: &str) {
    if let Err(err) = result {
        log::warn!("canvas2d: {what} failed: {err:?}");
    }
}

// ─── Bitmap uploads ──────────────────────────────────────────────────────

/// Decoded bitmaps copied into scratch canvases, so `drawImage` can scale
/// them under the current transform. Entries not drawn during a frame are
/// dropped when the frame ends.
#[derive(Default)]
pub struct UploadCache {
    entries: HashMap<usize, Upload>,
}

struct Upload {
    canvas: HtmlCanvasElement,
    used: bool,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn begin_frame(&mut self) {
        for upload in self.entries.values_mut() {
            upload.used = false;
        }
    }

    fn end_frame(&mut self) {
        self.entries.retain(|_, upload| upload.used);
    }

    /// The scratch canvas holding `bitmap`, uploading it on first use.
    fn canvas_for(&mut self, owner: &HtmlCanvasElement, bitmap: &Bitmap) -> Option<HtmlCanvasElement> {
        let key = Arc::as_ptr(&bitmap.rgba) as usize;
        if let Some(upload) = self.entries.get_mut(&key) {
            upload.used = true;
            return Some(upload.canvas.clone());
        }
        let canvas = upload_bitmap(owner, bitmap)?;
        self.entries.insert(
            key,
            Upload {
                canvas: canvas.clone(),
                used: true,
            },
        );
        Some(canvas)
    }
}

fn upload_bitmap(owner: &HtmlCanvasElement, bitmap: &Bitmap) -> Option<HtmlCanvasElement> {
    let document = owner.owner_document()?;
    let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    canvas.set_width(bitmap.width);
    canvas.set_height(bitmap.height);
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
    let data = match ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(bitmap.rgba.as_slice()),
        bitmap.width,
        bitmap.height,
    ) {
        Ok(data) => data,
        Err(err) => {
            log::warn!("canvas2d: bitmap {}x{} rejected: {err:?}", bitmap.width, bitmap.height);
            return None;
        }
    };
    check(ctx.put_image_data(&data, 0.0, 0.0), "putImageData");
    Some(canvas)
}

/// CSS `filter` value for image adjustments, or `None` when they are neutral.
pub fn image_filter(effects: &ImageEffects) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if effects.blur > 0.0 {
        parts.push(format!("blur({}px)", effects.blur));
    }
    if effects.brightness != 1.0 {
        parts.push(format!("brightness({})", effects.brightness));
    }
    if effects.contrast != 1.0 {
        parts.push(format!("contrast({})", effects.contrast));
    }
    if effects.saturation != 1.0 {
        parts.push(format!("saturate({})", effects.saturation));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// `current` with `extra` appended, treating `none` as empty.
fn chain_filter(current: &str, extra: &str) -> String {
    if current.is_empty() || current == "none" {
        extra.to_string()
    } else {
        format!("{current} {extra}")
    }
}

fn join_css(join: LineJoin) -> &'static str {
    match join {
        LineJoin::Miter => "miter",
        LineJoin::Round => "round",
        LineJoin::Bevel => "bevel",
    }
}

fn cap_css(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    }
}

fn align_css(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

// ─── Surface ─────────────────────────────────────────────────────────────

pub struct Canvas2dSurface<'a> {
    ctx: &'a CanvasRenderingContext2d,
    uploads: &'a mut UploadCache,
}

impl<'a> Canvas2dSurface<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, uploads: &'a mut UploadCache) -> Self {
        uploads.begin_frame();
        Self { ctx, uploads }
    }

    fn trace(&self, path: &PathData) {
        let ctx = self.ctx;
        ctx.begin_path();
        for cmd in path.cmds() {
            match *cmd {
                PathCmd::MoveTo(p) => ctx.move_to(p.x, p.y),
                PathCmd::LineTo(p) => ctx.line_to(p.x, p.y),
                PathCmd::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
                PathCmd::CubicTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
                PathCmd::Close => ctx.close_path(),
            }
        }
    }

    /// Set the fill (or stroke) style; gradients become `CanvasGradient`s.
    fn apply_paint(&self, paint: &Paint, stroke: bool) {
        let ctx = self.ctx;
        let gradient = match paint {
            Paint::Solid(color) => {
                let css = color.to_css();
                if stroke {
                    ctx.set_stroke_style_str(&css);
                } else {
                    ctx.set_fill_style_str(&css);
                }
                return;
            }
            Paint::Linear { start, end, stops } => {
                let grad = ctx.create_linear_gradient(start.x, start.y, end.x, end.y);
                (grad, stops)
            }
            Paint::Radial { center, radius, stops } => {
                match ctx.create_radial_gradient(center.x, center.y, 0.0, center.x, center.y, *radius) {
                    Ok(grad) => (grad, stops),
                    Err(err) => {
                        log::warn!("canvas2d: radial gradient failed: {err:?}");
                        let fallback = stops.first().map_or(Color::TRANSPARENT, |s| s.color);
                        self.apply_paint(&Paint::Solid(fallback), stroke);
                        return;
                    }
                }
            }
        };
        let (grad, stops) = gradient;
        for stop in stops {
            check(
                grad.add_color_stop(stop.offset.clamp(0.0, 1.0), &stop.color.to_css()),
                "addColorStop",
            );
        }
        if stroke {
            ctx.set_stroke_style_canvas_gradient(&grad);
        } else {
            ctx.set_fill_style_canvas_gradient(&grad);
        }
    }

    fn run_width(&self, run: &TextRun) -> f64 {
        let chars = run.text.chars().count() as f64;
        let spacing = (chars - 1.0).max(0.0) * run.letter_spacing;
        match self.ctx.measure_text(&run.text) {
            Ok(metrics) => metrics.width() + spacing,
            Err(_) => chars * run.size * clise_render::surface::APPROX_ADVANCE + spacing,
        }
    }
}

impl Drop for Canvas2dSurface<'_> {
    fn drop(&mut self) {
        self.uploads.end_frame();
    }
}

impl Surface for Canvas2dSurface<'_> {
    fn clear(&mut self, color: Color) {
        let ctx = self.ctx;
        let (w, h) = ctx
            .canvas()
            .map_or((0.0, 0.0), |c| (f64::from(c.width()), f64::from(c.height())));
        ctx.save();
        check(ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0), "setTransform");
        ctx.clear_rect(0.0, 0.0, w, h);
        if color.a > 0.0 {
            ctx.set_fill_style_str(&color.to_css());
            ctx.fill_rect(0.0, 0.0, w, h);
        }
        ctx.restore();
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        check(self.ctx.translate(dx, dy), "translate");
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        check(self.ctx.scale(sx, sy), "scale");
    }

    fn rotate(&mut self, radians: f64) {
        check(self.ctx.rotate(radians), "rotate");
    }

    fn fill_path(&mut self, path: &PathData, paint: &Paint) {
        self.trace(path);
        self.apply_paint(paint, false);
        self.ctx.fill();
    }

    fn stroke_path(&mut self, path: &PathData, paint: &Paint, stroke: &StrokeSpec) {
        let ctx = self.ctx;
        self.trace(path);
        self.apply_paint(paint, true);
        ctx.set_line_width(stroke.width);
        ctx.set_line_join(join_css(stroke.join));
        ctx.set_line_cap(cap_css(stroke.cap));
        let dashes: js_sys::Array = stroke.dashes.iter().map(|d| JsValue::from_f64(*d)).collect();
        check(ctx.set_line_dash(&dashes), "setLineDash");
        ctx.stroke();
    }

    fn clip(&mut self, path: &PathData, mode: ClipMode) {
        let ctx = self.ctx;
        self.trace(path);
        match mode {
            ClipMode::Intersect => ctx.clip(),
            ClipMode::Difference => {
                ctx.rect(-CLIP_EXTENT, -CLIP_EXTENT, 2.0 * CLIP_EXTENT, 2.0 * CLIP_EXTENT);
                ctx.clip_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
            }
        }
    }

    fn push_layer(&mut self, layer: &Layer) {
        let ctx = self.ctx;
        ctx.save();
        ctx.set_global_alpha(ctx.global_alpha() * f64::from(layer.opacity.clamp(0.0, 1.0)));
        check(
            ctx.set_global_composite_operation(blend_css(layer.blend)),
            "globalCompositeOperation",
        );
        if layer.blur > 0.0 {
            ctx.set_filter(&chain_filter(&ctx.filter(), &format!("blur({}px)", layer.blur)));
        }
    }

    fn pop_layer(&mut self) {
        self.ctx.restore();
    }

    fn fill_text(&mut self, run: &TextRun) {
        let ctx = self.ctx;
        ctx.set_font(&run.css_font());
        ctx.set_text_baseline("alphabetic");
        ctx.set_fill_style_str(&run.color.to_css());
        if run.letter_spacing == 0.0 {
            ctx.set_text_align(align_css(run.align));
            check(ctx.fill_text(&run.text, run.x, run.baseline), "fillText");
            return;
        }

        // Spaced text is laid out glyph by glyph from the left edge.
        let width = self.run_width(run);
        let mut x = match run.align {
            TextAlign::Left => run.x,
            TextAlign::Center => run.x - width / 2.0,
            TextAlign::Right => run.x - width,
        };
        ctx.set_text_align("left");
        let mut buf = [0u8; 4];
        for ch in run.text.chars() {
            let glyph = ch.encode_utf8(&mut buf);
            check(ctx.fill_text(glyph, x, run.baseline), "fillText");
            let advance = ctx
                .measure_text(glyph)
                .map_or(run.size * clise_render::surface::APPROX_ADVANCE, |m| m.width());
            x += advance + run.letter_spacing;
        }
    }

    fn measure_text(&mut self, run: &TextRun) -> f64 {
        self.ctx.set_font(&run.css_font());
        self.run_width(run)
    }

    fn draw_image(&mut self, image: &Bitmap, draw: &ImageDraw) {
        let ctx = self.ctx;
        let Some(owner) = ctx.canvas() else {
            return;
        };
        let Some(source) = self.uploads.canvas_for(&owner, image) else {
            return;
        };
        ctx.save();
        if let Some(filter) = image_filter(&draw.effects) {
            ctx.set_filter(&chain_filter(&ctx.filter(), &filter));
        }
        check(
            ctx.set_global_composite_operation(blend_css(draw.effects.blend_mode)),
            "globalCompositeOperation",
        );
        check(
            ctx.draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                &source,
                draw.src.x,
                draw.src.y,
                draw.src.width,
                draw.src.height,
                draw.dest.x,
                draw.dest.y,
                draw.dest.width,
                draw.dest.height,
            ),
            "drawImage",
        );
        ctx.restore();
    }
}
