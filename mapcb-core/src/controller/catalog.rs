//! Built-in handler kinds and their attach-time argument specs.
//!
//! Each event class exposes a fixed catalog. The declaration order of a
//! catalog is also the execution order used by
//! [`OrderingPolicy`](crate::controller::ordering::OrderingPolicy).

use std::fmt::{self, Write as _};
use std::str::FromStr;

use compact_str::CompactString;
use tracing::{debug, info};

use crate::error::{CallbackError, CallbackResult};
use crate::maps::Maps;
use crate::model::artifacts::{ArtifactKind, MarkerShape, PeekRegion, PickedValues};
use crate::model::identity::EventClass;
use crate::model::payload::{BoundArgs, EventPayload, PointPayload};

/// Pre-defined callback kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    ClearAnnotations,
    ClearMarkers,
    GetValues,
    PrintToConsole,
    Annotate,
    Mark,
    PeekLayer,
    SwitchLayer,
}

const CLICK_CATALOG: &[HandlerKind] = &[
    HandlerKind::ClearAnnotations,
    HandlerKind::ClearMarkers,
    HandlerKind::GetValues,
    HandlerKind::PrintToConsole,
    HandlerKind::Annotate,
    HandlerKind::Mark,
    HandlerKind::PeekLayer,
];

const PICK_CATALOG: &[HandlerKind] = &[
    HandlerKind::ClearAnnotations,
    HandlerKind::ClearMarkers,
    HandlerKind::GetValues,
    HandlerKind::PrintToConsole,
    HandlerKind::Annotate,
    HandlerKind::Mark,
];

const KEYPRESS_CATALOG: &[HandlerKind] = &[HandlerKind::SwitchLayer];

impl HandlerKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClearAnnotations => "clear_annotations",
            Self::ClearMarkers => "clear_markers",
            Self::GetValues => "get_values",
            Self::PrintToConsole => "print_to_console",
            Self::Annotate => "annotate",
            Self::Mark => "mark",
            Self::PeekLayer => "peek_layer",
            Self::SwitchLayer => "switch_layer",
        }
    }

    /// Kinds that may be attached more than once to the same bucket.
    pub const fn multi_attach(self) -> bool {
        matches!(self, Self::Mark | Self::Annotate)
    }

    /// Catalog of `class` in execution order.
    pub const fn catalog(class: EventClass) -> &'static [HandlerKind] {
        match class {
            EventClass::Click => CLICK_CATALOG,
            EventClass::Pick => PICK_CATALOG,
            EventClass::Keypress => KEYPRESS_CATALOG,
        }
    }

    pub fn supports(self, class: EventClass) -> bool {
        Self::catalog(class).contains(&self)
    }

    pub const fn accepted_args(self) -> &'static [&'static str] {
        match self {
            Self::ClearAnnotations
            | Self::ClearMarkers
            | Self::GetValues
            | Self::PrintToConsole => &[],
            Self::Annotate => &["permanent", "text"],
            Self::Mark => &["permanent", "shape", "radius", "facecolor", "edgecolor"],
            Self::PeekLayer => &["layer", "how"],
            Self::SwitchLayer => &["layer"],
        }
    }

    /// Resolve a catalog name for `class`.
    pub fn lookup(class: EventClass, name: &str) -> CallbackResult<Self> {
        match name.parse::<Self>() {
            Ok(kind) if kind.supports(class) => Ok(kind),
            _ => {
                let available = Self::catalog(class)
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                debug!(name, %class, "unknown handler kind");
                Err(CallbackError::UnknownHandlerKind {
                    name: name.into(),
                    class,
                    available,
                })
            }
        }
    }
}

impl FromStr for HandlerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear_annotations" => Ok(Self::ClearAnnotations),
            "clear_markers" => Ok(Self::ClearMarkers),
            "get_values" => Ok(Self::GetValues),
            "print_to_console" => Ok(Self::PrintToConsole),
            "annotate" => Ok(Self::Annotate),
            "mark" => Ok(Self::Mark),
            "peek_layer" => Ok(Self::PeekLayer),
            "switch_layer" => Ok(Self::SwitchLayer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotateSpec {
    pub permanent: bool,
    /// Fixed text; generated from the payload when absent.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkSpec {
    pub permanent: bool,
    pub shape: MarkerShape,
    pub radius: Option<f64>,
    pub facecolor: CompactString,
    pub edgecolor: CompactString,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            permanent: false,
            shape: MarkerShape::default(),
            radius: None,
            facecolor: CompactString::const_new("none"),
            edgecolor: CompactString::const_new("r"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeekSpec {
    pub layer: CompactString,
    pub region: PeekRegion,
}

/// A catalog handler with validated arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinCallback {
    ClearAnnotations,
    ClearMarkers,
    GetValues,
    PrintToConsole,
    Annotate(AnnotateSpec),
    Mark(MarkSpec),
    PeekLayer(PeekSpec),
    SwitchLayer { layer: CompactString },
}

impl BuiltinCallback {
    /// Validate `args` for `kind`; unknown names and wrong types are rejected.
    pub fn from_args(kind: HandlerKind, args: &BoundArgs) -> CallbackResult<Self> {
        args.check_reserved()?;
        if let Some(name) = args.names().find(|n| !kind.accepted_args().contains(n)) {
            return Err(CallbackError::UnexpectedArgument {
                kind: kind.name(),
                name: name.into(),
            });
        }

        let required_text = |name: &'static str| -> CallbackResult<CompactString> {
            args.get_text(name)?
                .map(CompactString::from)
                .ok_or(CallbackError::MissingArgument {
                    kind: kind.name(),
                    name,
                })
        };

        let callback = match kind {
            HandlerKind::ClearAnnotations => Self::ClearAnnotations,
            HandlerKind::ClearMarkers => Self::ClearMarkers,
            HandlerKind::GetValues => Self::GetValues,
            HandlerKind::PrintToConsole => Self::PrintToConsole,
            HandlerKind::Annotate => Self::Annotate(AnnotateSpec {
                permanent: args.get_bool("permanent")?.unwrap_or(false),
                text: args.get_text("text")?.map(str::to_owned),
            }),
            HandlerKind::Mark => {
                let defaults = MarkSpec::default();
                let radius = args.get_f64("radius")?;
                if radius.is_some_and(|r| !(r.is_finite() && r > 0.0)) {
                    return Err(CallbackError::invalid_argument("radius", "a positive number"));
                }
                Self::Mark(MarkSpec {
                    permanent: args.get_bool("permanent")?.unwrap_or(false),
                    shape: args
                        .get_text("shape")?
                        .map(str::parse::<MarkerShape>)
                        .transpose()?
                        .unwrap_or_default(),
                    radius,
                    facecolor: args
                        .get_text("facecolor")?
                        .map_or(defaults.facecolor, CompactString::from),
                    edgecolor: args
                        .get_text("edgecolor")?
                        .map_or(defaults.edgecolor, CompactString::from),
                })
            }
            HandlerKind::PeekLayer => Self::PeekLayer(PeekSpec {
                layer: required_text("layer")?,
                region: args
                    .get_text("how")?
                    .map(str::parse::<PeekRegion>)
                    .transpose()?
                    .unwrap_or_default(),
            }),
            HandlerKind::SwitchLayer => Self::SwitchLayer {
                layer: required_text("layer")?,
            },
        };

        Ok(callback)
    }

    pub const fn kind(&self) -> HandlerKind {
        match self {
            Self::ClearAnnotations => HandlerKind::ClearAnnotations,
            Self::ClearMarkers => HandlerKind::ClearMarkers,
            Self::GetValues => HandlerKind::GetValues,
            Self::PrintToConsole => HandlerKind::PrintToConsole,
            Self::Annotate(_) => HandlerKind::Annotate,
            Self::Mark(_) => HandlerKind::Mark,
            Self::PeekLayer(_) => HandlerKind::PeekLayer,
            Self::SwitchLayer { .. } => HandlerKind::SwitchLayer,
        }
    }

    pub(crate) fn invoke(&self, maps: &Maps, payload: &EventPayload) -> CallbackResult<()> {
        let class = payload.class();

        match self {
            Self::GetValues => {
                if let Some(point) = payload.target() {
                    maps.artifacts_mut().picked_values_mut().push(point);
                }
            }
            Self::PrintToConsole => match payload {
                EventPayload::Key(key) => info!(map = %maps.id(), key = %key.key, "key pressed"),
                _ => match payload.target() {
                    Some(point) => info!(map = %maps.id(), %class, "{}", describe(point)),
                    None => info!(map = %maps.id(), %class, "nothing selected"),
                },
            },
            Self::Annotate(spec) => {
                if let Some(point) = payload.target() {
                    let text = spec.text.clone().unwrap_or_else(|| describe(point));
                    let kind = ArtifactKind::Annotation { text };
                    maps.add_artifact(class, point.pos, kind, spec.permanent);
                }
            }
            Self::Mark(spec) => {
                if let Some(point) = payload.target() {
                    let kind = ArtifactKind::Marker {
                        shape: spec.shape,
                        radius: spec.radius,
                        facecolor: spec.facecolor.clone(),
                        edgecolor: spec.edgecolor.clone(),
                    };
                    maps.add_artifact(class, point.pos, kind, spec.permanent);
                }
            }
            Self::PeekLayer(spec) => {
                if let Some(point) = payload.target() {
                    let kind = ArtifactKind::LayerPeek {
                        layer: spec.layer.clone(),
                        region: spec.region,
                    };
                    maps.add_artifact(class, point.pos, kind, false);
                }
            }
            Self::ClearAnnotations => {
                let ids = maps.artifacts_mut().clear_permanent_annotations();
                maps.figure().discard(ids);
            }
            Self::ClearMarkers => {
                let ids = maps.artifacts_mut().clear_permanent_markers();
                maps.figure().discard(ids);
            }
            Self::SwitchLayer { layer } => {
                let figure = maps.figure();
                figure.set_active_layer(layer.clone());
                figure.update(None, false);
            }
        }

        Ok(())
    }

    /// Runs once after an entry of this kind was removed.
    pub(crate) fn cleanup(&self, maps: &Maps, class: EventClass) {
        match self {
            Self::GetValues => {
                *maps.artifacts_mut().picked_values_mut() = PickedValues::default();
            }
            Self::PeekLayer(_) => {
                let ids = maps.artifacts_mut().remove_temporary_where(class, |a| {
                    matches!(a.kind, ArtifactKind::LayerPeek { .. })
                });
                maps.figure().discard(ids);
            }
            _ => {}
        }
    }
}

fn describe(point: &PointPayload) -> String {
    let mut text = String::new();
    if let Some(id) = &point.id {
        let _ = writeln!(text, "ID: {id}");
    }
    let _ = write!(text, "x: {:.4}\ny: {:.4}", point.pos.0, point.pos.1);
    if let Some(value) = point.value {
        let _ = write!(text, "\nval: {value:.4}");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data::DataId;

    #[test]
    fn test_lookup_respects_class() {
        assert_eq!(
            HandlerKind::lookup(EventClass::Click, "peek_layer").unwrap(),
            HandlerKind::PeekLayer
        );

        let err = HandlerKind::lookup(EventClass::Pick, "peek_layer").unwrap_err();
        match err {
            CallbackError::UnknownHandlerKind { available, .. } => {
                assert!(available.starts_with("clear_annotations"));
                assert!(!available.contains("peek_layer"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(HandlerKind::lookup(EventClass::Keypress, "mark").is_err());
    }

    #[test]
    fn test_multi_attach_kinds() {
        assert!(HandlerKind::Mark.multi_attach());
        assert!(HandlerKind::Annotate.multi_attach());
        assert!(!HandlerKind::GetValues.multi_attach());
        assert!(!HandlerKind::SwitchLayer.multi_attach());
    }

    #[test]
    fn test_mark_args() {
        let args = BoundArgs::new()
            .with("permanent", true)
            .with("shape", "rectangles")
            .with("radius", 2);
        let parsed = BuiltinCallback::from_args(HandlerKind::Mark, &args).unwrap();
        let BuiltinCallback::Mark(spec) = parsed else {
            panic!("expected mark");
        };
        assert!(spec.permanent);
        assert_eq!(spec.shape, MarkerShape::Rectangle);
        assert_eq!(spec.radius, Some(2.0));
        assert_eq!(spec.edgecolor, "r");
    }

    #[test]
    fn test_argument_validation() {
        let unexpected = BoundArgs::new().with("colour", "red");
        assert!(matches!(
            BuiltinCallback::from_args(HandlerKind::Mark, &unexpected),
            Err(CallbackError::UnexpectedArgument { kind: "mark", .. })
        ));

        assert!(matches!(
            BuiltinCallback::from_args(HandlerKind::SwitchLayer, &BoundArgs::new()),
            Err(CallbackError::MissingArgument { name: "layer", .. })
        ));

        let wrong_type = BoundArgs::new().with("permanent", "yes");
        assert!(matches!(
            BuiltinCallback::from_args(HandlerKind::Annotate, &wrong_type),
            Err(CallbackError::InvalidArgument { .. })
        ));

        let reserved = BoundArgs::new().with("pos", 1.0);
        assert!(matches!(
            BuiltinCallback::from_args(HandlerKind::GetValues, &reserved),
            Err(CallbackError::ReservedArgument(_))
        ));

        let negative = BoundArgs::new().with("radius", -1.0);
        assert!(BuiltinCallback::from_args(HandlerKind::Mark, &negative).is_err());
    }

    #[test]
    fn test_describe_pick_point() {
        let point = PointPayload {
            pos: (1.0, 2.0),
            id: Some(DataId::Int(7)),
            value: Some(0.5),
            index: Some(7),
        };
        assert_eq!(describe(&point), "ID: 7\nx: 1.0000\ny: 2.0000\nval: 0.5000");
        assert_eq!(describe(&PointPayload::at((0.0, 0.0))), "x: 0.0000\ny: 0.0000");
    }
}
