//! Uniform spatial hash grid.
//!
//! Entries are keyed by their index in the element sequence, so query results
//! sorted ascending are already in z-order. An entry is stored in every cell
//! its bounds overlap; entries covering more than [`MAX_CELLS_PER_ENTRY`]
//! cells go to an overflow list that every query returns.

use crate::geometry::{Bounds, element_bounds};
use crate::model::Element;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Smallest allowed cell edge, in scene units.
pub const MIN_CELL_SIZE: f64 = 300.0;

/// Entries spanning more cells than this are kept out of the grid.
pub const MAX_CELLS_PER_ENTRY: i64 = 4096;

type CellKey = (i32, i32);

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, SmallVec<[usize; 8]>>,
    entries: HashMap<usize, Bounds>,
    oversized: Vec<usize>,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            MIN_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            entries: HashMap::new(),
            oversized: Vec::new(),
        }
    }

    /// Grid sized for neighbor queries up to `max_connection_distance`:
    /// `max(300, distance × 1.2)`.
    pub fn for_distance(max_connection_distance: f64) -> Self {
        Self::new(MIN_CELL_SIZE.max(max_connection_distance * 1.2))
    }

    /// Index every spatially valid element of the slice by position.
    pub fn build(elements: &[Element], max_connection_distance: f64) -> Self {
        let mut grid = Self::for_distance(max_connection_distance);
        for (index, el) in elements.iter().enumerate() {
            if el.is_spatially_valid() {
                grid.insert(index, element_bounds(el));
            }
        }
        grid
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bounds_of(&self, index: usize) -> Option<&Bounds> {
        self.entries.get(&index)
    }

    fn cell_coord(&self, v: f64) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    fn cell_range(&self, b: &Bounds) -> (CellKey, CellKey) {
        (
            (self.cell_coord(b.x), self.cell_coord(b.y)),
            (self.cell_coord(b.max_x()), self.cell_coord(b.max_y())),
        )
    }

    /// Insert an entry. Non-finite bounds are ignored.
    pub fn insert(&mut self, index: usize, bounds: Bounds) {
        if !bounds.is_finite() {
            return;
        }
        self.entries.insert(index, bounds);

        let ((x0, y0), (x1, y1)) = self.cell_range(&bounds);
        let span = (x1 as i64 - x0 as i64 + 1) * (y1 as i64 - y0 as i64 + 1);
        if span > MAX_CELLS_PER_ENTRY {
            self.oversized.push(index);
            return;
        }
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(index);
            }
        }
    }

    fn collect(&self, (x0, y0): CellKey, (x1, y1): CellKey) -> Vec<usize> {
        let mut out: Vec<usize> = self.oversized.clone();
        let span = (x1 as i64 - x0 as i64 + 1) * (y1 as i64 - y0 as i64 + 1);
        if span > self.cells.len() as i64 {
            // Sparse grid, huge query: walk the occupied cells instead.
            for (&(cx, cy), bucket) in &self.cells {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    out.extend_from_slice(bucket);
                }
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(bucket) = self.cells.get(&(cx, cy)) {
                        out.extend_from_slice(bucket);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Candidate neighbors of `index`: every entry in the cells covered by
    /// it, expanded by `ceil(max_distance / cell_size)` cells on each side.
    /// Excludes `index` itself.
    pub fn neighbors(&self, index: usize, max_distance: f64) -> Vec<usize> {
        let Some(bounds) = self.entries.get(&index) else {
            return Vec::new();
        };
        let reach = if max_distance.is_finite() && max_distance > 0.0 {
            (max_distance / self.cell_size).ceil() as i32
        } else {
            0
        };
        let ((x0, y0), (x1, y1)) = self.cell_range(bounds);
        let mut out = self.collect(
            (x0.saturating_sub(reach), y0.saturating_sub(reach)),
            (x1.saturating_add(reach), y1.saturating_add(reach)),
        );
        out.retain(|&i| i != index);
        out
    }

    /// Entries whose bounds intersect `rect` (touching counts), ascending.
    pub fn query_rect(&self, rect: &Bounds) -> Vec<usize> {
        if !rect.is_finite() {
            return Vec::new();
        }
        let (lo, hi) = self.cell_range(rect);
        let mut out = self.collect(lo, hi);
        out.retain(|i| self.entries.get(i).is_some_and(|b| b.intersects(rect)));
        out
    }
}
