pub mod fonts;
pub mod hit;
pub mod images;
pub mod recording;
pub mod renderer;
pub mod surface;
pub mod vello_surface;

pub use fonts::{FontHandle, FontRegistry, FontState};
pub use hit::{ClickMode, Handle, apply_click, box_select, expand_selection, hit_handle, hit_test, promote_groups};
pub use images::{Bitmap, ImageCache, ImageState};
pub use recording::{DrawOp, RecordingSurface};
pub use renderer::{FrameInput, FrameStats, Guide, RenderOptions, Renderer};
pub use surface::{ClipMode, Layer, Paint, PathData, StrokeSpec, Surface, TextRun};
pub use vello_surface::VelloSurface;
