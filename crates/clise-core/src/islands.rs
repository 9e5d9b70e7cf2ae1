//! Island detection: spatial clusters of elements for "jump to cluster"
//! navigation.
//!
//! Two elements are connected when their bounds overlap (touching does not
//! count) or their centers are at most `max_connection_distance` apart.
//! Islands are the connected components, found with union-find over
//! candidate pairs from a [`SpatialGrid`].

use crate::geometry::{Bounds, Point, element_bounds};
use crate::id::ElementId;
use crate::model::Element;
use crate::scene::Scene;
use crate::spatial::SpatialGrid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IslandOptions {
    /// Padding around an island when the camera frames it.
    pub cluster_threshold: f64,
    /// Components smaller than this are dropped.
    pub min_elements: usize,
    pub max_connection_distance: f64,
}

impl Default for IslandOptions {
    fn default() -> Self {
        Self {
            cluster_threshold: 200.0,
            min_elements: 1,
            max_connection_distance: 250.0,
        }
    }
}

/// A derived cluster. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    pub id: usize,
    pub elements: Vec<ElementId>,
    pub bounds: Bounds,
    pub center: Point,
    pub element_count: usize,
}

impl Island {
    fn from_members(id: usize, elements: Vec<ElementId>, bounds: Bounds) -> Self {
        Self {
            id,
            element_count: elements.len(),
            center: bounds.center(),
            elements,
            bounds,
        }
    }

    /// Bounds grown by `padding`, for camera framing.
    pub fn framing_bounds(&self, padding: f64) -> Bounds {
        self.bounds.inflate(padding)
    }
}

// ─── Union-find ──────────────────────────────────────────────────────────

/// Disjoint sets with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
        true
    }
}

// ─── Detection ───────────────────────────────────────────────────────────

/// Cluster the visible, spatially valid elements.
///
/// Islands are ordered top-to-bottom, then left-to-right, and numbered in
/// that order. If no component reaches `min_elements`, every valid element
/// becomes its own island.
pub fn detect_islands(elements: &[Element], options: &IslandOptions) -> Vec<Island> {
    let eligible: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.visible && e.is_spatially_valid())
        .map(|(i, _)| i)
        .collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let mut grid = SpatialGrid::for_distance(options.max_connection_distance);
    for &i in &eligible {
        grid.insert(i, element_bounds(&elements[i]));
    }

    let mut sets = UnionFind::new(elements.len());
    let max_d = options.max_connection_distance;
    for &i in &eligible {
        let Some(a) = grid.bounds_of(i).copied() else {
            continue;
        };
        for j in grid.neighbors(i, max_d) {
            if j < i {
                continue; // each pair once
            }
            let Some(b) = grid.bounds_of(j) else { continue };
            if a.overlaps_strict(b) || a.center().distance(b.center()) <= max_d {
                sets.union(i, j);
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for &i in &eligible {
        if grid.bounds_of(i).is_some() {
            components.entry(sets.find(i)).or_default().push(i);
        }
    }

    let min = options.min_elements.max(1);
    let mut groups: Vec<Vec<usize>> = components
        .into_values()
        .filter(|members| members.len() >= min)
        .collect();
    if groups.is_empty() {
        groups = eligible
            .iter()
            .filter(|i| grid.bounds_of(**i).is_some())
            .map(|&i| vec![i])
            .collect();
    }

    let mut islands: Vec<Island> = groups
        .into_iter()
        .filter_map(|mut members| {
            members.sort_unstable();
            let bounds = Bounds::union_all(members.iter().filter_map(|&i| grid.bounds_of(i)))?;
            let ids = members.iter().map(|&i| elements[i].id).collect();
            Some(Island::from_members(0, ids, bounds))
        })
        .collect();

    islands.sort_by(|a, b| {
        a.bounds
            .y
            .total_cmp(&b.bounds.y)
            .then(a.bounds.x.total_cmp(&b.bounds.x))
    });
    for (n, island) in islands.iter_mut().enumerate() {
        island.id = n;
    }
    log::debug!(
        "islands: {} clusters from {} elements",
        islands.len(),
        eligible.len()
    );
    islands
}

/// Recompute an island's bounds from its members' current geometry.
/// Members that vanished or became invalid are skipped.
pub fn update_island_bounds(island: &Island, scene: &Scene) -> Island {
    let boxes: Vec<Bounds> = island
        .elements
        .iter()
        .filter_map(|id| scene.get(*id))
        .filter(|e| e.is_spatially_valid())
        .map(element_bounds)
        .collect();
    let bounds = Bounds::union_all(&boxes).unwrap_or(island.bounds);
    Island {
        bounds,
        center: bounds.center(),
        ..island.clone()
    }
}

// ─── Service ─────────────────────────────────────────────────────────────

/// Caches islands per scene version and tracks the navigation cursor.
#[derive(Debug, Clone, Default)]
pub struct IslandDetector {
    options: IslandOptions,
    cached_version: Option<u64>,
    islands: Vec<Island>,
    cursor: Option<usize>,
}

impl IslandDetector {
    pub fn new(options: IslandOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &IslandOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: IslandOptions) {
        self.options = options;
        self.invalidate();
    }

    /// Drop the cache; the next query recomputes.
    pub fn invalidate(&mut self) {
        self.cached_version = None;
    }

    /// Islands for the scene, recomputed only when its version changed.
    pub fn islands(&mut self, scene: &Scene) -> &[Island] {
        if self.cached_version != Some(scene.version()) {
            self.islands = detect_islands(scene.elements(), &self.options);
            self.cached_version = Some(scene.version());
            if self.cursor.is_some_and(|c| c >= self.islands.len()) {
                self.cursor = None;
            }
        }
        &self.islands
    }

    pub fn island_containing(&mut self, scene: &Scene, id: ElementId) -> Option<&Island> {
        self.islands(scene).iter().find(|i| i.elements.contains(&id))
    }

    /// Advance to the next island, wrapping around.
    pub fn next(&mut self, scene: &Scene) -> Option<&Island> {
        let len = self.islands(scene).len();
        if len == 0 {
            return None;
        }
        let n = self.cursor.map_or(0, |c| (c + 1) % len);
        self.cursor = Some(n);
        self.islands.get(n)
    }

    /// Step back to the previous island, wrapping around.
    pub fn previous(&mut self, scene: &Scene) -> Option<&Island> {
        let len = self.islands(scene).len();
        if len == 0 {
            return None;
        }
        let n = self.cursor.map_or(len - 1, |c| (c + len - 1) % len);
        self.cursor = Some(n);
        self.islands.get(n)
    }

    pub fn reset(&mut self) {
        self.islands.clear();
        self.cached_version = None;
        self.cursor = None;
    }
}
