//! Structured callback identities.
//!
//! Internally an attachment is addressed by `(base_name, sequence,
//! classifier)`. The string form `"{base_name}_{sequence}__{classifier}"` is
//! only produced when an identity leaves the crate and parsed back when a
//! caller hands it to `remove`.

use std::fmt;
use std::str::FromStr;

use compact_str::{CompactString, ToCompactString};
use enum_map::Enum;
use serde::{Deserialize, Serialize};

use crate::error::{CallbackError, CallbackResult};

/// Separator between the entry key and the classifier parts.
pub const SEPARATOR: &str = "__";

/// The three event classes callbacks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    Click,
    Pick,
    Keypress,
}

impl EventClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Pick => "pick",
            Self::Keypress => "keypress",
        }
    }

    /// Spatial classes carry a position and are reprojected when forwarded.
    pub const fn is_spatial(self) -> bool {
        matches!(self, Self::Click | Self::Pick)
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single or double click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClickArity {
    #[default]
    Single,
    Double,
}

impl ClickArity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }

    pub const fn from_dblclick(dblclick: bool) -> Self {
        if dblclick { Self::Double } else { Self::Single }
    }
}

impl FromStr for ClickArity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            _ => Err(()),
        }
    }
}

/// Host mouse button id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MouseButton(pub u8);

impl MouseButton {
    pub const LEFT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);
    pub const RIGHT: Self = Self(3);
    pub const BACK: Self = Self(8);
    pub const FORWARD: Self = Self(9);
}

impl Default for MouseButton {
    fn default() -> Self {
        Self::LEFT
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sub-key that selects a bucket within one event class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// Click arity and mouse button (click and pick callbacks).
    Button {
        arity: ClickArity,
        button: MouseButton,
    },

    /// Key string such as `"a"` or `"alt+d"` (keypress callbacks).
    Key(CompactString),
}

impl Classifier {
    pub const fn single(button: MouseButton) -> Self {
        Self::Button {
            arity: ClickArity::Single,
            button,
        }
    }

    pub const fn double(button: MouseButton) -> Self {
        Self::Button {
            arity: ClickArity::Double,
            button,
        }
    }

    pub fn key<K: Into<CompactString>>(key: K) -> Self {
        Self::Key(key.into())
    }

    /// Whether this classifier addresses buckets of `class`.
    pub fn matches(&self, class: EventClass) -> bool {
        match self {
            Self::Button { .. } => class.is_spatial(),
            Self::Key(_) => class == EventClass::Keypress,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::single(MouseButton::LEFT)
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button { arity, button } => {
                write!(f, "{}{SEPARATOR}{}", arity.as_str(), button)
            }
            Self::Key(key) => f.write_str(key),
        }
    }
}

/// `base_name` plus `sequence`; unique within one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub base_name: CompactString,
    pub sequence: u32,
}

impl EntryKey {
    pub fn new<N: Into<CompactString>>(base_name: N, sequence: u32) -> Self {
        Self {
            base_name: base_name.into(),
            sequence,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let (base_name, sequence) = s.rsplit_once('_')?;
        if base_name.is_empty() {
            return None;
        }
        let sequence = sequence.parse().ok()?;
        Some(Self::new(base_name, sequence))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base_name, self.sequence)
    }
}

/// Removal handle of one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackId {
    pub key: EntryKey,
    pub classifier: Classifier,
}

impl CallbackId {
    pub fn new(key: EntryKey, classifier: Classifier) -> Self {
        Self { key, classifier }
    }

    pub fn base_name(&self) -> &str {
        &self.key.base_name
    }

    pub fn sequence(&self) -> u32 {
        self.key.sequence
    }

    /// Parse the string form produced by `Display` for the given class.
    ///
    /// Click and pick identities must split into exactly three parts on
    /// [`SEPARATOR`]; keypress identities split once, so key strings may
    /// contain the separator themselves.
    pub fn parse(class: EventClass, s: &str) -> CallbackResult<Self> {
        let malformed = || CallbackError::malformed_identity(s, class);

        let (key, classifier) = match class {
            EventClass::Click | EventClass::Pick => {
                let mut parts = s.split(SEPARATOR);
                let (Some(key), Some(arity), Some(button), None) =
                    (parts.next(), parts.next(), parts.next(), parts.next())
                else {
                    return Err(malformed());
                };
                let arity = arity.parse::<ClickArity>().map_err(|()| malformed())?;
                let button = button.parse::<u8>().map_err(|_| malformed())?;
                (
                    key,
                    Classifier::Button {
                        arity,
                        button: MouseButton(button),
                    },
                )
            }
            EventClass::Keypress => {
                let (key, pressed) = s.split_once(SEPARATOR).ok_or_else(malformed)?;
                if pressed.is_empty() {
                    return Err(malformed());
                }
                (key, Classifier::key(pressed))
            }
        };

        let key = EntryKey::parse(key).ok_or_else(malformed)?;
        Ok(Self::new(key, classifier))
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.key, self.classifier)
    }
}

/// Reject base names that would make the string identity ambiguous.
pub fn validate_base_name(name: &str) -> CallbackResult<()> {
    if name.is_empty() || name.contains(SEPARATOR) || name.ends_with('_') {
        return Err(CallbackError::ReservedSeparator(name.to_compact_string()));
    }
    Ok(())
}
