//! `.clise` document import/export.
//!
//! ```json
//! { "version": 1, "elements": [...], "groups": [...] | {...},
//!   "viewport": { "zoom": 1, "pan": { "x": 0, "y": 0 } } }
//! ```
//!
//! Import never trusts ids from the file: every element and group gets a
//! fresh id, and `parentId` / group members are rewritten through one
//! old → new table. Elements that fail to parse or have non-finite geometry
//! are dropped, as are references to them.

use crate::error::{ExportError, ImportError};
use crate::geometry::Point;
use crate::id::ElementId;
use crate::model::{Element, ElementKind, Group};
use crate::scene::{Scene, SceneMutation};
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ZERO,
        }
    }
}

/// Group entry of the map form; the key is the group id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyedGroup {
    element_ids: Vec<ElementId>,
    #[serde(default)]
    name: Option<String>,
}

/// Groups may be written as a list or as an id-keyed map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GroupsRepr {
    List(Vec<Group>),
    Map(BTreeMap<String, KeyedGroup>),
}

impl Default for GroupsRepr {
    fn default() -> Self {
        GroupsRepr::List(Vec::new())
    }
}

impl GroupsRepr {
    fn into_groups(self) -> Vec<Group> {
        match self {
            GroupsRepr::List(groups) => groups,
            GroupsRepr::Map(map) => map
                .into_iter()
                .map(|(id, g)| Group {
                    id: ElementId::intern(&id),
                    element_ids: g.element_ids.into_iter().collect(),
                    name: g.name,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    elements: Vec<serde_json::Value>,
    #[serde(default)]
    groups: GroupsRepr,
    #[serde(default)]
    viewport: ViewportState,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// Serialize a scene and camera as a `.clise` document.
pub fn export_document(scene: &Scene, viewport: &Viewport) -> Result<String, ExportError> {
    let doc = RawDocument {
        version: FORMAT_VERSION,
        elements: scene
            .elements()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?,
        groups: GroupsRepr::List(scene.groups().to_vec()),
        viewport: ViewportState {
            zoom: viewport.zoom,
            pan: viewport.pan,
        },
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// A parsed document with fresh ids, ready to merge into a scene.
#[derive(Debug, Clone)]
pub struct ImportedDocument {
    pub elements: Vec<Element>,
    pub groups: Vec<Group>,
    pub viewport: ViewportState,
    /// Old id → new id, for elements and groups.
    pub id_map: HashMap<ElementId, ElementId>,
    /// Entries dropped as malformed or non-finite.
    pub skipped: usize,
}

impl ImportedDocument {
    /// One mutation inserting every element on top of the scene and
    /// recreating the groups, then selecting the imported content.
    pub fn into_mutation(self) -> SceneMutation {
        let mut selection: Vec<ElementId> = self.groups.iter().map(|g| g.id).collect();
        selection.extend(
            self.elements
                .iter()
                .filter(|e| !self.groups.iter().any(|g| g.contains(e.id)))
                .map(|e| e.id),
        );

        let mut steps: Vec<SceneMutation> = self
            .elements
            .into_iter()
            .map(|element| SceneMutation::Insert {
                element: Box::new(element),
                index: None,
            })
            .collect();
        steps.extend(
            self.groups
                .into_iter()
                .map(|group| SceneMutation::Group { group }),
        );
        steps.push(SceneMutation::Select { ids: selection });
        SceneMutation::Batch(steps)
    }

    /// A standalone scene holding just this document.
    pub fn into_scene(self) -> Result<Scene, ImportError> {
        Ok(Scene::from_parts(self.elements, self.groups, Vec::new())?)
    }
}

fn geometry_is_finite(el: &Element) -> bool {
    let line_ok = match el.kind {
        ElementKind::Line { x2, y2 } => x2.is_finite() && y2.is_finite(),
        _ => true,
    };
    [el.x, el.y, el.w, el.h, el.rotation, el.opacity]
        .iter()
        .all(|v| v.is_finite())
        && line_ok
}

/// Parse a `.clise` document and assign fresh ids.
pub fn import_document(json: &str) -> Result<ImportedDocument, ImportError> {
    let raw: RawDocument = serde_json::from_str(json)?;
    if raw.version > FORMAT_VERSION {
        return Err(ImportError::UnsupportedVersion(raw.version));
    }

    let mut skipped = 0;
    let mut elements: Vec<Element> = Vec::with_capacity(raw.elements.len());
    for value in raw.elements {
        match serde_json::from_value::<Element>(value) {
            Ok(el) if geometry_is_finite(&el) => elements.push(el),
            Ok(el) => {
                log::warn!("import: dropping {} with non-finite geometry", el.id);
                skipped += 1;
            }
            Err(err) => {
                log::warn!("import: dropping malformed element: {err}");
                skipped += 1;
            }
        }
    }

    let mut id_map: HashMap<ElementId, ElementId> = HashMap::new();
    elements.retain(|el| {
        if id_map.contains_key(&el.id) {
            log::warn!("import: duplicate id {} dropped", el.id);
            skipped += 1;
            return false;
        }
        id_map.insert(el.id, ElementId::with_prefix(el.kind.name()));
        true
    });

    for el in &mut elements {
        el.id = id_map[&el.id];
        el.parent_id = el.parent_id.and_then(|p| id_map.get(&p).copied());
        el.opacity = el.opacity.clamp(0.0, 1.0);
    }

    let groups: Vec<Group> = raw
        .groups
        .into_groups()
        .into_iter()
        .filter_map(|g| {
            let mut members: SmallVec<[ElementId; 4]> = SmallVec::new();
            for m in g.element_ids.iter().filter_map(|m| id_map.get(m)) {
                if !members.contains(m) {
                    members.push(*m);
                }
            }
            if members.len() < 2 {
                log::warn!("import: group {} has fewer than 2 members, dropped", g.id);
                return None;
            }
            let fresh = ElementId::with_prefix("group");
            id_map.insert(g.id, fresh);
            Some(Group {
                id: fresh,
                element_ids: members,
                name: g.name,
            })
        })
        .collect();

    log::debug!(
        "import: {} elements, {} groups, {} skipped",
        elements.len(),
        groups.len(),
        skipped
    );
    Ok(ImportedDocument {
        elements,
        groups,
        viewport: raw.viewport,
        id_map,
        skipped,
    })
}
