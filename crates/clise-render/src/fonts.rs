//! Font registry.
//!
//! `resolve` always answers immediately: a loaded family resolves to itself,
//! anything else resolves to the fallback while the family is queued for
//! loading. The host loads queued families and reports back; a successful
//! load raises a redraw request so text reflows in the real face.

use std::collections::HashMap;

pub const DEFAULT_FALLBACK: &str = "sans-serif";

/// Families every host can draw without loading.
const SYSTEM_FAMILIES: &[&str] = &["sans-serif", "serif", "monospace", "system-ui"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontState {
    Loading,
    Ready,
    Failed,
}

/// A font to draw with right now.
#[derive(Debug, Clone, PartialEq)]
pub struct FontHandle {
    pub family: String,
    pub size: f64,
    pub weight: u16,
    /// False while the requested family is still loading (or failed).
    pub exact: bool,
}

#[derive(Debug)]
pub struct FontRegistry {
    fallback: String,
    states: HashMap<String, FontState>,
    pending: Vec<String>,
    redraw: bool,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK)
    }
}

impl FontRegistry {
    pub fn new(fallback: &str) -> Self {
        let states = SYSTEM_FAMILIES
            .iter()
            .chain(std::iter::once(&fallback))
            .map(|f| (f.to_string(), FontState::Ready))
            .collect();
        Self {
            fallback: fallback.to_string(),
            states,
            pending: Vec::new(),
            redraw: false,
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn resolve(&mut self, family: &str, size: f64, weight: u16) -> FontHandle {
        let state = match self.states.get(family) {
            Some(s) => *s,
            None => {
                log::debug!("font: queue load of {family:?}");
                self.states.insert(family.to_string(), FontState::Loading);
                self.pending.push(family.to_string());
                FontState::Loading
            }
        };
        let exact = state == FontState::Ready;
        FontHandle {
            family: if exact {
                family.to_string()
            } else {
                self.fallback.clone()
            },
            size,
            weight,
            exact,
        }
    }

    pub fn state(&self, family: &str) -> Option<FontState> {
        self.states.get(family).copied()
    }

    /// Families the host should start loading. Drains the queue.
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    pub fn mark_loaded(&mut self, family: &str) {
        let previous = self.states.insert(family.to_string(), FontState::Ready);
        if previous != Some(FontState::Ready) {
            self.redraw = true;
        }
    }

    pub fn mark_failed(&mut self, family: &str) {
        log::warn!("font: {family:?} failed to load, using {:?}", self.fallback);
        self.states.insert(family.to_string(), FontState::Failed);
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}
