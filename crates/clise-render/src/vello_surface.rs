//! [`Surface`] backed by a Vello scene.
//!
//! The host owns the wgpu device and presents `VelloSurface::scene()`.
//! Clips become clip layers that `restore` pops; layer blur has no Vello
//! equivalent and is drawn unfiltered.

use crate::images::Bitmap;
use crate::surface::{
    ClipMode, ImageDraw, Layer, LineCap, LineJoin, Paint, PathCmd, PathData, StrokeSpec, Surface,
    TextRun,
};
use clise_core::model::BlendMode;
use kurbo::{Affine, BezPath, Cap, Join, Point, Rect, Stroke as KurboStroke};
use peniko::{Blob, Brush, Color, ColorStop, Fill, ImageFormat as Format, Gradient, Image, Mix};
use std::collections::HashMap;
use vello::Scene;

/// Half-extent of the rectangle a difference clip is cut out of.
const FAR: f64 = 1.0e7;

#[derive(Debug, Clone, Copy)]
struct SavedState {
    transform: Affine,
    clip_layers: usize,
}

pub struct VelloSurface {
    scene: Scene,
    size: Rect,
    transform: Affine,
    clip_layers: usize,
    stack: Vec<SavedState>,
    images: HashMap<usize, Image>,
}

impl VelloSurface {
    /// A surface covering `width × height` device pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            scene: Scene::new(),
            size: Rect::new(0.0, 0.0, width as f64, height as f64),
            transform: Affine::IDENTITY,
            clip_layers: 0,
            stack: Vec::new(),
            images: HashMap::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Rect::new(0.0, 0.0, width as f64, height as f64);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Drop cached GPU images whose bitmaps are gone.
    pub fn retain_images(&mut self, live: &[&Bitmap]) {
        self.images
            .retain(|key, _| live.iter().any(|b| image_key(b) == *key));
    }

    fn pop_clip_layers(&mut self, count: usize) {
        for _ in 0..count {
            self.scene.pop_layer();
        }
    }
}

fn image_key(bitmap: &Bitmap) -> usize {
    std::sync::Arc::as_ptr(&bitmap.rgba) as usize
}

// ─── Conversions ─────────────────────────────────────────────────────────

fn to_color(c: clise_core::Color) -> Color {
    let [r, g, b, a] = c.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}

fn to_point(p: clise_core::Point) -> Point {
    Point::new(p.x, p.y)
}

fn to_bez(path: &PathData) -> BezPath {
    let mut bez = BezPath::new();
    for cmd in path.cmds() {
        match *cmd {
            PathCmd::MoveTo(p) => bez.move_to(to_point(p)),
            PathCmd::LineTo(p) => bez.line_to(to_point(p)),
            PathCmd::QuadTo(c, p) => bez.quad_to(to_point(c), to_point(p)),
            PathCmd::CubicTo(c1, c2, p) => bez.curve_to(to_point(c1), to_point(c2), to_point(p)),
            PathCmd::Close => bez.close_path(),
        }
    }
    bez
}

fn to_brush(paint: &Paint) -> Brush {
    let stops_of = |stops: &[crate::surface::ColorStop]| -> Vec<ColorStop> {
        stops
            .iter()
            .map(|s| ColorStop::from((s.offset, to_color(s.color))))
            .collect()
    };
    match paint {
        Paint::Solid(c) => Brush::Solid(to_color(*c)),
        Paint::Linear { start, end, stops } => Brush::Gradient(
            Gradient::new_linear(to_point(*start), to_point(*end))
                .with_stops(stops_of(stops).as_slice()),
        ),
        Paint::Radial {
            center,
            radius,
            stops,
        } => Brush::Gradient(
            Gradient::new_radial(to_point(*center), *radius as f32)
                .with_stops(stops_of(stops).as_slice()),
        ),
    }
}

fn to_stroke(spec: &StrokeSpec) -> KurboStroke {
    let cap = match spec.cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    };
    let stroke = KurboStroke {
        width: spec.width,
        join: match spec.join {
            LineJoin::Miter => Join::Miter,
            LineJoin::Round => Join::Round,
            LineJoin::Bevel => Join::Bevel,
        },
        start_cap: cap,
        end_cap: cap,
        ..Default::default()
    };
    if spec.dashes.is_empty() {
        stroke
    } else {
        stroke.with_dashes(0.0, spec.dashes.iter().copied())
    }
}

fn to_mix(mode: BlendMode) -> Mix {
    match mode {
        BlendMode::Normal => Mix::Normal,
        BlendMode::Multiply => Mix::Multiply,
        BlendMode::Screen => Mix::Screen,
        BlendMode::Overlay => Mix::Overlay,
        BlendMode::Darken => Mix::Darken,
        BlendMode::Lighten => Mix::Lighten,
        BlendMode::ColorDodge => Mix::ColorDodge,
        BlendMode::ColorBurn => Mix::ColorBurn,
        BlendMode::HardLight => Mix::HardLight,
        BlendMode::SoftLight => Mix::SoftLight,
        BlendMode::Difference => Mix::Difference,
        BlendMode::Exclusion => Mix::Exclusion,
        BlendMode::Hue => Mix::Hue,
        BlendMode::Saturation => Mix::Saturation,
        BlendMode::Color => Mix::Color,
        BlendMode::Luminosity => Mix::Luminosity,
    }
}

// ─── Surface ─────────────────────────────────────────────────────────────

impl Surface for VelloSurface {
    fn clear(&mut self, color: clise_core::Color) {
        self.scene.reset();
        self.transform = Affine::IDENTITY;
        self.clip_layers = 0;
        self.stack.clear();
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, to_color(color), None, &self.size);
    }

    fn save(&mut self) {
        self.stack.push(SavedState {
            transform: self.transform,
            clip_layers: self.clip_layers,
        });
        self.clip_layers = 0;
    }

    fn restore(&mut self) {
        self.pop_clip_layers(self.clip_layers);
        match self.stack.pop() {
            Some(state) => {
                self.transform = state.transform;
                self.clip_layers = state.clip_layers;
            }
            None => {
                log::warn!("vello: restore without matching save");
                self.transform = Affine::IDENTITY;
                self.clip_layers = 0;
            }
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform = self.transform * Affine::translate((dx, dy));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform = self.transform * Affine::scale_non_uniform(sx, sy);
    }

    fn rotate(&mut self, radians: f64) {
        self.transform = self.transform * Affine::rotate(radians);
    }

    fn fill_path(&mut self, path: &PathData, paint: &Paint) {
        let brush = to_brush(paint);
        self.scene
            .fill(Fill::NonZero, self.transform, &brush, None, &to_bez(path));
    }

    fn stroke_path(&mut self, path: &PathData, paint: &Paint, stroke: &StrokeSpec) {
        let brush = to_brush(paint);
        self.scene
            .stroke(&to_stroke(stroke), self.transform, &brush, None, &to_bez(path));
    }

    fn clip(&mut self, path: &PathData, mode: ClipMode) {
        let shape = match mode {
            ClipMode::Intersect => to_bez(path),
            ClipMode::Difference => {
                // Counter-clockwise outer rectangle; a clockwise shape inside
                // it cancels to winding zero and is cut out.
                let mut bez = BezPath::new();
                bez.move_to((-FAR, -FAR));
                bez.line_to((-FAR, FAR));
                bez.line_to((FAR, FAR));
                bez.line_to((FAR, -FAR));
                bez.close_path();
                bez.extend(to_bez(path));
                bez
            }
        };
        self.scene.push_layer(Mix::Clip, 1.0, self.transform, &shape);
        self.clip_layers += 1;
    }

    fn push_layer(&mut self, layer: &Layer) {
        if layer.blur > 0.0 {
            log::trace!("vello: layer blur {} drawn unfiltered", layer.blur);
        }
        self.scene.push_layer(
            to_mix(layer.blend),
            layer.opacity.clamp(0.0, 1.0),
            Affine::IDENTITY,
            &self.size,
        );
    }

    fn pop_layer(&mut self) {
        self.scene.pop_layer();
    }

    fn fill_text(&mut self, run: &TextRun) {
        // Glyph shaping needs a font context owned by the host.
        log::trace!(
            "vello: text {:?} at ({}, {}) in {}",
            run.text,
            run.x,
            run.baseline,
            run.css_font()
        );
    }

    fn draw_image(&mut self, bitmap: &Bitmap, draw: &ImageDraw) {
        if draw.src.width <= 0.0 || draw.src.height <= 0.0 {
            return;
        }
        if !draw.effects.is_identity() {
            log::trace!("vello: image effects drawn as identity");
        }
        let image = self
            .images
            .entry(image_key(bitmap))
            .or_insert_with(|| {
                Image::new(
                    Blob::new(bitmap.rgba.clone()),
                    Format::Rgba8,
                    bitmap.width,
                    bitmap.height,
                )
            })
            .clone();

        let placement = self.transform
            * Affine::translate((draw.dest.x, draw.dest.y))
            * Affine::scale_non_uniform(
                draw.dest.width / draw.src.width,
                draw.dest.height / draw.src.height,
            )
            * Affine::translate((-draw.src.x, -draw.src.y));

        let cropped = draw.src.x > 0.0
            || draw.src.y > 0.0
            || draw.src.width < bitmap.width as f64
            || draw.src.height < bitmap.height as f64;
        if cropped {
            let dest = Rect::new(
                draw.dest.x,
                draw.dest.y,
                draw.dest.max_x(),
                draw.dest.max_y(),
            );
            self.scene.push_layer(Mix::Clip, 1.0, self.transform, &dest);
            self.scene.draw_image(&image, placement);
            self.scene.pop_layer();
        } else {
            self.scene.draw_image(&image, placement);
        }
    }
}
