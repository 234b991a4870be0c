// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! OPENLabel JSON data structures for serde serialization/deserialization.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::{cmp::Ordering, collections::BTreeMap};

/// Tag of the canonical bounding box of an object.
pub const FULL_BBOX: &str = "full_bbox";

/// Class label used when an object declares neither a type nor a name.
pub const FALLBACK_LABEL: &str = "object";

/// Parsed content of one label file.
///
/// The payload normally sits under `openlabel`; older exports wrap it as
/// `{"data": {"openlabel": …}}`, which [`AnnotationRecord::root`] also
/// understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// OPENLabel payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openlabel: Option<OpenLabel>,
    /// Legacy wrapper around the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<AnnotationRecord>>,
    /// Unmodelled top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `openlabel` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenLabel {
    /// Annotated time-frames keyed by frame id (normally exactly one).
    #[serde(default)]
    pub frames: BTreeMap<String, FrameEntry>,
    /// Metadata, coordinate systems and other unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One annotated time-frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Objects keyed by object id.
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectEntry>,
    /// Unmodelled frame keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One annotated object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_data: Option<ObjectData>,
    /// Object-level name, consulted when `object_data` has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object-level type, consulted when `object_data` has none.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Unmodelled object keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `object_data` block of an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    /// Display name, usually `<TYPE>_<index>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Class label such as `CAR`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Named bounding boxes.
    #[serde(default)]
    pub bbox: Vec<NamedBox>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named bounding box.
///
/// The four values are read two ways by the tooling around this dataset: the
/// overlay renderer treats them as `center_x, center_y, width, height` while
/// the region-of-interest adjustment treats them as `x, y, width, height`
/// from the top-left corner. Both readings are exposed, see
/// [`NamedBox::center_corners`] and [`NamedBox::top_left_corners`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedBox {
    /// Box tag, [`FULL_BBOX`] for the canonical box.
    #[serde(default)]
    pub name: String,
    /// Four coordinates.
    #[serde(default, serialize_with = "serialize_coords")]
    pub val: Vec<f64>,
    /// Sensor and other attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Frame and object ids are numeric strings; order them as numbers.
fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Write integral coordinates back as JSON integers.
fn serialize_coords<S: Serializer>(val: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(val.len()))?;
    for v in val {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
            seq.serialize_element(&(*v as i64))?;
        } else {
            seq.serialize_element(v)?;
        }
    }
    seq.end()
}

impl AnnotationRecord {
    /// The OPENLabel payload, unwrapping the legacy `data` wrapper.
    pub fn root(&self) -> Option<&OpenLabel> {
        match (&self.openlabel, &self.data) {
            (Some(root), _) => Some(root),
            (None, Some(data)) => data.openlabel.as_ref(),
            (None, None) => None,
        }
    }

    /// Mutable access to the OPENLabel payload.
    pub fn root_mut(&mut self) -> Option<&mut OpenLabel> {
        match (&mut self.openlabel, &mut self.data) {
            (Some(root), _) => Some(root),
            (None, Some(data)) => data.openlabel.as_mut(),
            (None, None) => None,
        }
    }

    /// Annotated time-frames ordered by numeric frame id.
    pub fn frames(&self) -> Vec<(&str, &FrameEntry)> {
        let mut frames: Vec<_> = self
            .root()
            .map(|root| {
                root.frames
                    .iter()
                    .map(|(id, frame)| (id.as_str(), frame))
                    .collect()
            })
            .unwrap_or_default();
        frames.sort_by(|a, b| id_order(a.0, b.0));
        frames
    }

    /// Every object of every time-frame.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.frames()
            .into_iter()
            .flat_map(|(_, frame)| frame.objects_ordered())
    }

    /// Every bounding box of every object, mutably.
    pub fn boxes_mut(&mut self) -> impl Iterator<Item = &mut NamedBox> {
        self.root_mut()
            .into_iter()
            .flat_map(|root| root.frames.values_mut())
            .flat_map(|frame| frame.objects.values_mut())
            .filter_map(|object| object.object_data.as_mut())
            .flat_map(|data| data.bbox.iter_mut())
    }
}

impl FrameEntry {
    /// Objects ordered by numeric object id.
    pub fn objects_ordered(&self) -> Vec<&ObjectEntry> {
        let mut objects: Vec<_> = self.objects.iter().collect();
        objects.sort_by(|a, b| id_order(a.0, b.0));
        objects.into_iter().map(|(_, object)| object).collect()
    }
}

impl ObjectEntry {
    /// Declared type, from `object_data` first and the object itself second.
    pub fn object_type(&self) -> Option<&str> {
        self.object_data
            .as_ref()
            .and_then(|d| non_empty(&d.object_type))
            .or_else(|| non_empty(&self.object_type))
    }

    /// Declared name, from `object_data` first and the object itself second.
    pub fn object_name(&self) -> Option<&str> {
        self.object_data
            .as_ref()
            .and_then(|d| non_empty(&d.name))
            .or_else(|| non_empty(&self.name))
    }

    /// Class label: the type, else the name, else [`FALLBACK_LABEL`].
    pub fn class_label(&self) -> &str {
        self.object_type()
            .or_else(|| self.object_name())
            .unwrap_or(FALLBACK_LABEL)
    }
}

impl ObjectData {
    /// The box tagged [`FULL_BBOX`].
    pub fn full_bbox(&self) -> Option<&NamedBox> {
        self.bbox.iter().find(|b| b.is_full_bbox())
    }

    /// The full box, falling back to the first box of any tag.
    pub fn primary_bbox(&self) -> Option<&NamedBox> {
        self.full_bbox().or_else(|| self.bbox.first())
    }
}

impl NamedBox {
    /// Whether this is the canonical box.
    pub fn is_full_bbox(&self) -> bool {
        self.name == FULL_BBOX
    }

    /// Corners `[x_min, y_min, x_max, y_max]` reading `val` as
    /// `center_x, center_y, width, height`, rounded half to even.
    pub fn center_corners(&self) -> Option<[i64; 4]> {
        let [cx, cy, w, h] = self.values()?;
        Some([
            (cx - w / 2.0).round_ties_even() as i64,
            (cy - h / 2.0).round_ties_even() as i64,
            (cx + w / 2.0).round_ties_even() as i64,
            (cy + h / 2.0).round_ties_even() as i64,
        ])
    }

    /// Corners `[x_min, y_min, x_max, y_max]` reading `val` as
    /// `x, y, width, height` from the top-left corner.
    pub fn top_left_corners(&self) -> Option<[f64; 4]> {
        let [x, y, w, h] = self.values()?;
        Some([x, y, x + w, y + h])
    }

    /// Move the box origin by `(-dx, -dy)`, keeping its size.
    pub fn shift_origin(&mut self, dx: f64, dy: f64) {
        if let Some(x) = self.val.get_mut(0) {
            *x -= dx;
        }
        if let Some(y) = self.val.get_mut(1) {
            *y -= dy;
        }
    }

    fn values(&self) -> Option<[f64; 4]> {
        match self.val.as_slice() {
            [a, b, c, d] => Some([*a, *b, *c, *d]),
            _ => None,
        }
    }
}
