//! src/error.rs
//! ============================================================================
//! # `CallbackError`: Unified Error Type for Callback Dispatch
//!
//! Every fallible operation in the crate returns `CallbackResult<T>`.
//! Attach-time configuration problems, malformed identities, reprojection
//! failures and handler failures each get their own variant so callers can
//! match on them instead of parsing messages.

use std::{io, path::PathBuf};

use compact_str::CompactString;
use thiserror::Error;

use crate::model::identity::EventClass;

pub type CallbackResult<T> = Result<T, CallbackError>;

/// Unified error type for callback registration, dispatch and configuration.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Name lookup against the built-in catalog failed.
    #[error("The function '{name}' does not exist as a pre-defined {class} callback. Use one of: {available}")]
    UnknownHandlerKind {
        name: CompactString,
        class: EventClass,
        available: String,
    },

    /// A payload or classifier field name was passed as a bound argument.
    #[error("The name '{0}' is reserved and cannot be used as keyword-argument")]
    ReservedArgument(CompactString),

    /// A built-in handler received an argument it does not understand.
    #[error("Callback '{kind}' does not accept the argument '{name}'")]
    UnexpectedArgument {
        kind: &'static str,
        name: CompactString,
    },

    /// A required argument of a built-in handler is missing.
    #[error("Callback '{kind}' requires the argument '{name}'")]
    MissingArgument {
        kind: &'static str,
        name: &'static str,
    },

    /// A bound argument has the wrong type or an unparsable value.
    #[error("Invalid value for argument '{name}': expected {expected}")]
    InvalidArgument {
        name: CompactString,
        expected: &'static str,
    },

    /// Second attachment of a handler kind that is not multi-attach safe.
    #[error("Multiple assignments of the callback '{name}' to '{classifier}' are not supported")]
    DuplicateAttachment {
        name: CompactString,
        classifier: String,
    },

    /// A handler name that would break the identity string format.
    #[error("Invalid callback name '{0}': names must be non-empty, must not contain '__' and must not end with '_'")]
    ReservedSeparator(CompactString),

    /// The classifier does not belong to the container's event class.
    #[error("Classifier '{classifier}' cannot be used for {class} callbacks")]
    ClassifierMismatch {
        classifier: String,
        class: EventClass,
    },

    /// An identity string that cannot be split into its parts.
    #[error("Malformed {class} callback identity: '{id}'")]
    MalformedIdentity { id: String, class: EventClass },

    /// No coordinate transform between two projections.
    #[error("Cannot reproject coordinates from '{from}' to '{to}'")]
    ReprojectionUnsupported {
        from: CompactString,
        to: CompactString,
    },

    /// Parallel data arrays of different lengths.
    #[error("Data field '{field}' has {found} entries, expected {expected}")]
    MismatchedData {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// A callback failed while handling an event.
    #[error("Callback '{name}' failed: {reason}")]
    HandlerFailed { name: CompactString, reason: String },

    /// Malformed TOML in a configuration file.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config serialization error.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Reading or writing a configuration file failed.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Errors without a dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl CallbackError {
    #[must_use]
    /// Prefix the message with `ctx`.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Create a handler failure error; custom callbacks return this.
    pub fn handler_failed<N, S>(name: N, reason: S) -> Self
    where
        N: Into<CompactString>,
        S: Into<String>,
    {
        Self::HandlerFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<N: Into<CompactString>>(name: N, expected: &'static str) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            expected,
        }
    }

    /// Create a malformed identity error
    pub fn malformed_identity<S: Into<String>>(id: S, class: EventClass) -> Self {
        Self::MalformedIdentity {
            id: id.into(),
            class,
        }
    }

    /// Create a config I/O error
    pub fn config_io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was raised by attach-time validation.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownHandlerKind { .. }
                | Self::ReservedArgument(_)
                | Self::UnexpectedArgument { .. }
                | Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::DuplicateAttachment { .. }
                | Self::ReservedSeparator(_)
                | Self::ClassifierMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_classification() {
        let duplicate = CallbackError::DuplicateAttachment {
            name: "get_values".into(),
            classifier: "single__1".to_string(),
        };
        assert!(duplicate.is_configuration_error());

        let failed = CallbackError::handler_failed("custom", "boom");
        assert!(!failed.is_configuration_error());
        assert_eq!(failed.to_string(), "Callback 'custom' failed: boom");
    }

    #[test]
    fn test_with_context() {
        let err = CallbackError::ReservedArgument("pos".into()).with_context("attach");
        assert!(matches!(err, CallbackError::Other(ref msg) if msg.starts_with("attach: ")));
    }
}
