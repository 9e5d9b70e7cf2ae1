pub mod color;
pub mod error;
pub mod file;
pub mod geometry;
pub mod id;
pub mod islands;
pub mod layout;
pub mod model;
pub mod path;
pub mod scene;
pub mod snapshot;
pub mod spatial;
pub mod viewport;

pub use color::{Color, parse_color};
pub use error::{EditError, ExportError, ImportError};
pub use file::{ImportedDocument, export_document, import_document};
pub use geometry::{Bounds, Point, element_bounds, export_bounds, point_in_element};
pub use id::ElementId;
pub use islands::{Island, IslandDetector, IslandOptions, detect_islands, update_island_bounds};
pub use layout::recompute_parents;
pub use model::*;
pub use scene::{ReorderOp, Scene, SceneMutation};
pub use snapshot::{Size, Snapshot};
pub use spatial::SpatialGrid;
pub use viewport::{Viewport, ZoomLimits};
