//! Overlays produced by callbacks and the values they collect.
//!
//! Rendering is the host's business; the crate only keeps track of which
//! artifacts exist, which are temporary and when they must be cleared.

use std::str::FromStr;

use compact_str::CompactString;
use enum_map::EnumMap;

use crate::error::CallbackError;
use crate::model::data::DataId;
use crate::model::identity::EventClass;
use crate::model::payload::PointPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(pub u64);

/// Marker outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerShape {
    #[default]
    Ellipse,
    Rectangle,
    Scatter,
}

impl FromStr for MarkerShape {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ellipses" | "ellipse" => Ok(Self::Ellipse),
            "rectangles" | "rectangle" => Ok(Self::Rectangle),
            "scatter_points" | "scatter" => Ok(Self::Scatter),
            _ => Err(CallbackError::invalid_argument(
                "shape",
                "one of 'ellipses', 'rectangles', 'scatter_points'",
            )),
        }
    }
}

/// Part of the axes a layer peek uncovers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeekRegion {
    #[default]
    Full,
    Left,
    Right,
    Top,
    Bottom,
}

impl FromStr for PeekRegion {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            _ => Err(CallbackError::invalid_argument(
                "how",
                "one of 'full', 'left', 'right', 'top', 'bottom'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactKind {
    Marker {
        shape: MarkerShape,
        radius: Option<f64>,
        facecolor: CompactString,
        edgecolor: CompactString,
    },
    Annotation {
        text: String,
    },
    LayerPeek {
        layer: CompactString,
        region: PeekRegion,
    },
}

/// One overlay drawn at a map position.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub class: EventClass,
    pub pos: (f64, f64),
    pub kind: ArtifactKind,
    pub permanent: bool,
}

impl Artifact {
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, ArtifactKind::Marker { .. })
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self.kind, ArtifactKind::Annotation { .. })
    }
}

/// Values collected by the `get_values` callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickedValues {
    pub pos: Vec<(f64, f64)>,
    pub ids: Vec<Option<DataId>>,
    pub values: Vec<Option<f64>>,
}

impl PickedValues {
    pub fn push(&mut self, point: &PointPayload) {
        self.pos.push(point.pos);
        self.ids.push(point.id.clone());
        self.values.push(point.value);
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }
}

/// Per-map artifact bookkeeping.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    temporary: EnumMap<EventClass, Vec<Artifact>>,
    permanent_markers: Vec<Artifact>,
    permanent_annotations: Vec<Artifact>,
    picked_values: PickedValues,
}

impl ArtifactStore {
    pub fn add(&mut self, artifact: Artifact) {
        if !artifact.permanent {
            self.temporary[artifact.class].push(artifact);
        } else if artifact.is_annotation() {
            self.permanent_annotations.push(artifact);
        } else {
            self.permanent_markers.push(artifact);
        }
    }

    pub fn temporary(&self, class: EventClass) -> &[Artifact] {
        &self.temporary[class]
    }

    /// Hand the current temporary artifacts of `class` over for clearing.
    pub fn take_temporary(&mut self, class: EventClass) -> Vec<Artifact> {
        std::mem::take(&mut self.temporary[class])
    }

    /// Drop temporary artifacts matching `pred`, returning their ids.
    pub fn remove_temporary_where<F>(&mut self, class: EventClass, pred: F) -> Vec<ArtifactId>
    where
        F: Fn(&Artifact) -> bool,
    {
        let mut removed = Vec::new();
        self.temporary[class].retain(|a| {
            if pred(a) {
                removed.push(a.id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn permanent_markers(&self) -> &[Artifact] {
        &self.permanent_markers
    }

    pub fn permanent_annotations(&self) -> &[Artifact] {
        &self.permanent_annotations
    }

    pub fn clear_permanent_markers(&mut self) -> Vec<ArtifactId> {
        self.permanent_markers.drain(..).map(|a| a.id).collect()
    }

    pub fn clear_permanent_annotations(&mut self) -> Vec<ArtifactId> {
        self.permanent_annotations.drain(..).map(|a| a.id).collect()
    }

    pub fn picked_values(&self) -> &PickedValues {
        &self.picked_values
    }

    pub fn picked_values_mut(&mut self) -> &mut PickedValues {
        &mut self.picked_values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: u64, kind: ArtifactKind, permanent: bool) -> Artifact {
        Artifact {
            id: ArtifactId(id),
            class: EventClass::Click,
            pos: (0.0, 0.0),
            kind,
            permanent,
        }
    }

    fn marker() -> ArtifactKind {
        ArtifactKind::Marker {
            shape: MarkerShape::Ellipse,
            radius: None,
            facecolor: "r".into(),
            edgecolor: "k".into(),
        }
    }

    #[test]
    fn test_routing_by_permanence() {
        let mut store = ArtifactStore::default();
        store.add(artifact(1, marker(), true));
        store.add(artifact(2, ArtifactKind::Annotation { text: "a".into() }, true));
        store.add(artifact(3, marker(), false));

        assert_eq!(store.permanent_markers().len(), 1);
        assert_eq!(store.permanent_annotations().len(), 1);
        assert_eq!(store.temporary(EventClass::Click).len(), 1);
        assert!(store.temporary(EventClass::Pick).is_empty());

        let taken = store.take_temporary(EventClass::Click);
        assert_eq!(taken[0].id, ArtifactId(3));
        assert!(store.temporary(EventClass::Click).is_empty());

        assert_eq!(store.clear_permanent_markers(), vec![ArtifactId(1)]);
        assert!(store.permanent_markers().is_empty());
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("rectangles".parse::<MarkerShape>().unwrap(), MarkerShape::Rectangle);
        assert!("hexagons".parse::<MarkerShape>().is_err());
        assert_eq!("left".parse::<PeekRegion>().unwrap(), PeekRegion::Left);
    }
}
