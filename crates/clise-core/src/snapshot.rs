//! Persisted editor state.
//!
//! JSON for debugging and the host's storage; a MessagePack encoding
//! (`rmp-serde`, named fields) for compact local caches. Both round-trip
//! every element field losslessly.

use crate::error::{ExportError, ImportError};
use crate::geometry::Point;
use crate::id::ElementId;
use crate::model::{Element, Group};
use crate::scene::Scene;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub document_name: String,
    pub elements: Vec<Element>,
    /// Z-order of `elements`, bottom first.
    pub element_ids: Vec<ElementId>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub selection: Vec<ElementId>,
    #[serde(default)]
    pub tool: String,
    pub zoom: f64,
    pub pan: Point,
    #[serde(default)]
    pub viewport_size: Size,
    #[serde(default)]
    pub canvas_size: Size,
}

impl Snapshot {
    pub fn capture(
        document_name: &str,
        scene: &Scene,
        viewport: &Viewport,
        tool: &str,
        viewport_size: Size,
        canvas_size: Size,
    ) -> Self {
        Self {
            document_name: document_name.to_string(),
            elements: scene.elements().to_vec(),
            element_ids: scene.order(),
            groups: scene.groups().to_vec(),
            selection: scene.selection().to_vec(),
            tool: tool.to_string(),
            zoom: viewport.zoom,
            pan: viewport.pan,
            viewport_size,
            canvas_size,
        }
    }

    /// Rebuild the scene and camera. Elements follow `element_ids`; any
    /// element missing from that list keeps its relative position at the end.
    pub fn restore(&self) -> Result<(Scene, Viewport), ImportError> {
        let rank: HashMap<ElementId, usize> = self
            .element_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let mut elements = self.elements.clone();
        elements.sort_by_key(|e| rank.get(&e.id).copied().unwrap_or(usize::MAX));

        let scene = Scene::from_parts(elements, self.groups.clone(), self.selection.clone())?;
        let viewport = Viewport::new(self.pan, self.zoom);
        Ok((scene, viewport))
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ExportError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImportError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, PathPoint, Shadow, ShadowKind};
    use pretty_assertions::assert_eq;

    fn sample() -> Snapshot {
        let mut card = Element::rect("snap_card", 10.0, 20.0, 100.0, -40.0);
        card.rotation = 0.5;
        card.shadow = Some(Shadow {
            offset_x: 2.0,
            offset_y: 4.0,
            blur: 8.0,
            spread: 0.0,
            color: "#00000080".into(),
            opacity: 1.0,
            kind: ShadowKind::Inner,
        });
        let pen = Element::path(
            "snap_pen",
            0.0,
            0.0,
            vec![PathPoint::new(0.0, 0.0), PathPoint::new(30.0, 10.0)],
            false,
        );
        let mut scene = Scene::from_parts(
            vec![card, pen],
            vec![Group::new(
                ElementId::intern("snap_group"),
                [ElementId::intern("snap_card"), ElementId::intern("snap_pen")],
            )],
            vec![ElementId::intern("snap_group")],
        )
        .unwrap();
        crate::layout::recompute_parents(&mut scene);
        Snapshot::capture(
            "Untitled",
            &scene,
            &Viewport::new(Point::new(-20.0, 15.0), 1.25),
            "select",
            Size::new(1280.0, 720.0),
            Size::new(4000.0, 4000.0),
        )
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let snap = sample();
        let back = Snapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn binary_roundtrip_is_lossless() {
        let snap = sample();
        let back = Snapshot::from_bytes(&snap.to_bytes().unwrap()).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn restore_follows_element_order() {
        let mut snap = sample();
        snap.element_ids.reverse();
        let (scene, viewport) = snap.restore().unwrap();
        assert_eq!(scene.order(), snap.element_ids);
        assert_eq!(scene.selection(), &[ElementId::intern("snap_group")]);
        assert_eq!(viewport.zoom, 1.25);
        assert!(matches!(scene.elements()[0].kind, ElementKind::Path { .. }));
    }
}
