//! A surface that records calls instead of drawing.

use crate::images::Bitmap;
use crate::surface::{ClipMode, ImageDraw, Layer, Paint, PathData, StrokeSpec, Surface, TextRun};
use clise_core::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Save,
    Restore,
    Translate(f64, f64),
    Scale(f64, f64),
    Rotate(f64),
    Fill { path: PathData, paint: Paint },
    Stroke { path: PathData, paint: Paint, stroke: StrokeSpec },
    Clip { path: PathData, mode: ClipMode },
    PushLayer(Layer),
    PopLayer,
    Text(TextRun),
    Image { width: u32, height: u32, draw: ImageDraw },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> impl Iterator<Item = (&PathData, &Paint)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Fill { path, paint } => Some((path, paint)),
            _ => None,
        })
    }

    pub fn strokes(&self) -> impl Iterator<Item = (&PathData, &StrokeSpec)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Stroke { path, stroke, .. } => Some((path, stroke)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.ops.push(DrawOp::Translate(dx, dy));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.ops.push(DrawOp::Scale(sx, sy));
    }

    fn rotate(&mut self, radians: f64) {
        self.ops.push(DrawOp::Rotate(radians));
    }

    fn fill_path(&mut self, path: &PathData, paint: &Paint) {
        self.ops.push(DrawOp::Fill {
            path: path.clone(),
            paint: paint.clone(),
        });
    }

    fn stroke_path(&mut self, path: &PathData, paint: &Paint, stroke: &StrokeSpec) {
        self.ops.push(DrawOp::Stroke {
            path: path.clone(),
            paint: paint.clone(),
            stroke: stroke.clone(),
        });
    }

    fn clip(&mut self, path: &PathData, mode: ClipMode) {
        self.ops.push(DrawOp::Clip {
            path: path.clone(),
            mode,
        });
    }

    fn push_layer(&mut self, layer: &Layer) {
        self.ops.push(DrawOp::PushLayer(*layer));
    }

    fn pop_layer(&mut self) {
        self.ops.push(DrawOp::PopLayer);
    }

    fn fill_text(&mut self, run: &TextRun) {
        self.ops.push(DrawOp::Text(run.clone()));
    }

    fn draw_image(&mut self, image: &Bitmap, draw: &ImageDraw) {
        self.ops.push(DrawOp::Image {
            width: image.width,
            height: image.height,
            draw: draw.clone(),
        });
    }
}
