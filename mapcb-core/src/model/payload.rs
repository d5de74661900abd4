//! Normalized event payloads and attach-time bound arguments.

use std::fmt;

use compact_str::{CompactString, ToCompactString};
use indexmap::IndexMap;

use crate::error::{CallbackError, CallbackResult};
use crate::model::data::DataId;
use crate::model::identity::EventClass;

/// Argument names owned by the payload or the classifier.
pub const RESERVED_ARGS: [&str; 7] = ["pos", "ID", "val", "ind", "double_click", "button", "key"];

/// Payload of a click or pick event.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPayload {
    /// Position in the receiving map's projection.
    pub pos: (f64, f64),
    pub id: Option<DataId>,
    pub value: Option<f64>,
    pub index: Option<usize>,
}

impl PointPayload {
    /// Payload without any data point attached (clicks, unresolved picks).
    pub fn at(pos: (f64, f64)) -> Self {
        Self {
            pos,
            id: None,
            value: None,
            index: None,
        }
    }

    /// `false` when a pick resolved to nothing.
    pub fn is_selected(&self) -> bool {
        self.index.is_some()
    }
}

/// Payload of a keypress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPayload {
    pub key: CompactString,
}

/// What each callback receives, tagged by event class.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Click(PointPayload),
    Pick(PointPayload),
    Key(KeyPayload),
}

impl EventPayload {
    pub fn key<K: Into<CompactString>>(key: K) -> Self {
        Self::Key(KeyPayload { key: key.into() })
    }

    pub fn class(&self) -> EventClass {
        match self {
            Self::Click(_) => EventClass::Click,
            Self::Pick(_) => EventClass::Pick,
            Self::Key(_) => EventClass::Keypress,
        }
    }

    pub fn point(&self) -> Option<&PointPayload> {
        match self {
            Self::Click(point) | Self::Pick(point) => Some(point),
            Self::Key(_) => None,
        }
    }

    pub fn pressed_key(&self) -> Option<&str> {
        match self {
            Self::Key(payload) => Some(&payload.key),
            _ => None,
        }
    }

    /// The point a spatial handler should act on: clicks always have one,
    /// picks only when a data point was resolved.
    pub fn target(&self) -> Option<&PointPayload> {
        match self {
            Self::Click(point) => Some(point),
            Self::Pick(point) if point.is_selected() => Some(point),
            _ => None,
        }
    }
}

/// Value of a bound argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(CompactString),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_compact_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Text(v.into())
    }
}

/// Keyword arguments fixed at attach time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: IndexMap<CompactString, ArgValue>,
}

impl BoundArgs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<N: Into<CompactString>, V: Into<ArgValue>>(mut self, name: N, value: V) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert<N: Into<CompactString>, V: Into<ArgValue>>(&mut self, name: N, value: V) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(CompactString::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fail on the first argument that shadows a payload or classifier field.
    pub fn check_reserved(&self) -> CallbackResult<()> {
        match self.names().find(|name| RESERVED_ARGS.contains(name)) {
            Some(name) => Err(CallbackError::ReservedArgument(name.to_compact_string())),
            None => Ok(()),
        }
    }

    pub fn get_bool(&self, name: &str) -> CallbackResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(ArgValue::Bool(v)) => Ok(Some(*v)),
            Some(_) => Err(CallbackError::invalid_argument(name, "a boolean")),
        }
    }

    /// Integers are accepted where floats are expected.
    pub fn get_f64(&self, name: &str) -> CallbackResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ArgValue::Float(v)) => Ok(Some(*v)),
            Some(ArgValue::Int(v)) => Ok(Some(*v as f64)),
            Some(_) => Err(CallbackError::invalid_argument(name, "a number")),
        }
    }

    pub fn get_text(&self, name: &str) -> CallbackResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(ArgValue::Text(v)) => Ok(Some(v.as_str())),
            Some(_) => Err(CallbackError::invalid_argument(name, "a string")),
        }
    }
}

/// Everything a callback is invoked with besides the owning map.
#[derive(Debug, Clone, Copy)]
pub struct CallbackArgs<'a> {
    pub payload: &'a EventPayload,
    pub bound: &'a BoundArgs,
}
