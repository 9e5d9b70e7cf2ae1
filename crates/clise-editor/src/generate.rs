//! Synthetic scene generation for load testing.
//!
//! [`BulkGenerator`] is an iterator of insert batches, each at most
//! `chunk_size` elements, so the host can apply one chunk per frame and keep
//! handling input in between.

use clise_core::model::{ElementKind, Fill};
use clise_core::{Bounds, Element, ElementId, SceneMutation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const PALETTE: [&str; 8] = [
    "#F24E1E", "#FF7262", "#A259FF", "#1ABCFE", "#0ACF83", "#FFC700", "#2C2C2C", "#D9D9D9",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub count: usize,
    pub chunk_size: usize,
    /// Elements are placed fully inside this area.
    pub area: Bounds,
    pub min_size: f64,
    pub max_size: f64,
    pub seed: u64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            count: 1000,
            chunk_size: 250,
            area: Bounds::new(0.0, 0.0, 10_000.0, 10_000.0),
            min_size: 20.0,
            max_size: 200.0,
            seed: 0x5EED,
        }
    }
}

pub struct BulkGenerator {
    options: GeneratorOptions,
    rng: StdRng,
    produced: usize,
}

impl BulkGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        let mut options = options;
        options.chunk_size = options.chunk_size.max(1);
        if options.max_size < options.min_size {
            std::mem::swap(&mut options.min_size, &mut options.max_size);
        }
        options.min_size = options.min_size.max(1.0);
        options.max_size = options.max_size.max(options.min_size);
        Self {
            rng: StdRng::seed_from_u64(options.seed),
            options,
            produced: 0,
        }
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn remaining(&self) -> usize {
        self.options.count - self.produced
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    fn element(&mut self) -> Element {
        let opts = &self.options;
        let (min, max) = (opts.min_size, opts.max_size);
        let w = if max > min { self.rng.random_range(min..=max) } else { min };
        let h = if max > min { self.rng.random_range(min..=max) } else { min };
        let x = opts.area.x + self.rng.random_range(0.0..=(opts.area.width - w).max(0.0));
        let y = opts.area.y + self.rng.random_range(0.0..=(opts.area.height - h).max(0.0));

        let kind = if self.rng.random_bool(0.5) {
            ElementKind::rect()
        } else {
            ElementKind::ellipse()
        };
        let id = ElementId::with_prefix(kind.name());
        let mut el = Element::new(id, kind, x, y, w, h);
        el.fill = Fill::solid(PALETTE[self.rng.random_range(0..PALETTE.len())]);
        el
    }
}

impl Iterator for BulkGenerator {
    type Item = SceneMutation;

    /// The next chunk as one insert batch.
    fn next(&mut self) -> Option<SceneMutation> {
        let n = self.remaining().min(self.options.chunk_size);
        if n == 0 {
            return None;
        }
        let steps = (0..n)
            .map(|_| SceneMutation::Insert {
                element: Box::new(self.element()),
                index: None,
            })
            .collect();
        self.produced += n;
        log::debug!(
            "generate: chunk of {n}, {}/{}",
            self.produced,
            self.options.count
        );
        Some(SceneMutation::Batch(steps))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining().div_ceil(self.options.chunk_size);
        (chunks, Some(chunks))
    }
}
