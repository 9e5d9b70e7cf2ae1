//! Editor tuning knobs.
//!
//! Every field has a default, so a host can pass a partial JSON object and
//! override only what it needs.

use crate::error::EngineError;
use clise_core::{IslandOptions, ZoomLimits};
use clise_render::RenderOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub zoom_limits: ZoomLimits,
    /// Zoom factor per wheel notch and per zoom-in/zoom-out shortcut.
    pub zoom_step: f64,
    /// Trailing window for the containment recompute after edits.
    pub debounce_ms: f64,
    /// How long the panning indicator stays on after the last pan delta.
    pub pan_decay_ms: f64,
    pub undo_depth: usize,
    /// Screen-pixel tolerance for hitting lines.
    pub hit_tolerance: f64,
    /// Resize handle edge, in screen pixels.
    pub handle_size: f64,
    /// Clicking this close (screen pixels) to a path's first point closes it.
    pub path_close_tolerance: f64,
    /// Padding around content for zoom-to-fit.
    pub fit_padding: f64,
    pub islands: IslandOptions,
    pub render: RenderOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom_limits: ZoomLimits::default(),
            zoom_step: 1.2,
            debounce_ms: 100.0,
            pan_decay_ms: 150.0,
            undo_depth: 200,
            hit_tolerance: clise_core::geometry::LINE_HIT_TOLERANCE,
            handle_size: 8.0,
            path_close_tolerance: 8.0,
            fit_padding: 40.0,
            islands: IslandOptions::default(),
            render: RenderOptions::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EditorConfig = serde_json::from_str(json).map_err(EngineError::Config)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(EngineError::Config)
    }

    /// Replace nonsensical values with their defaults.
    fn sanitized(mut self) -> Self {
        let defaults = EditorConfig::default();
        let limits = self.zoom_limits;
        if !(limits.min > 0.0 && limits.min <= limits.max && limits.max.is_finite()) {
            log::warn!("config: invalid zoom range {limits:?}, using default");
            self.zoom_limits = defaults.zoom_limits;
        }
        if !(self.zoom_step > 1.0 && self.zoom_step.is_finite()) {
            self.zoom_step = defaults.zoom_step;
        }
        if self.debounce_ms < 0.0 || !self.debounce_ms.is_finite() {
            self.debounce_ms = defaults.debounce_ms;
        }
        if self.pan_decay_ms < 0.0 || !self.pan_decay_ms.is_finite() {
            self.pan_decay_ms = defaults.pan_decay_ms;
        }
        if self.undo_depth == 0 {
            self.undo_depth = defaults.undo_depth;
        }
        self.render.handle_size = self.handle_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"undoDepth": 5, "debounceMs": 50}"#).unwrap();
        assert_eq!(config.undo_depth, 5);
        assert_eq!(config.debounce_ms, 50.0);
        assert_eq!(config.pan_decay_ms, 150.0);
        assert_eq!(config.islands, IslandOptions::default());
    }

    #[test]
    fn invalid_values_fall_back() {
        let config =
            EditorConfig::from_json(r#"{"zoomLimits": {"min": 5, "max": 1}, "zoomStep": 0.5}"#)
                .unwrap();
        assert_eq!(config.zoom_limits, ZoomLimits::default());
        assert_eq!(config.zoom_step, 1.2);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EditorConfig::from_json("{undoDepth").is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }
}
