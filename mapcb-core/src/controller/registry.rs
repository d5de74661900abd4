//! CallbackRegistry: per event-class storage of attached callbacks
//!
//! Entries live in buckets keyed by [`Classifier`]; within a bucket each
//! entry is keyed by `base_name` and a sequence number allocated at attach:
//! - Smallest free sequence per `base_name`, never overwriting an entry
//! - Fail-fast duplicate check for kinds that are not multi-attach safe
//! - Validation runs before anything is stored
//! - Bucket snapshots ordered by [`OrderingPolicy`] for dispatch

use std::fmt;
use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;
use tracing::debug;

use crate::controller::catalog::BuiltinCallback;
use crate::controller::ordering::OrderingPolicy;
use crate::error::{CallbackError, CallbackResult};
use crate::maps::Maps;
use crate::model::identity::{CallbackId, Classifier, EntryKey, EventClass, validate_base_name};
use crate::model::payload::{BoundArgs, CallbackArgs};

/// Signature of a caller-supplied callback; the owning map comes first.
pub type HandlerFn = dyn Fn(&Maps, &CallbackArgs<'_>) -> CallbackResult<()>;

/// Runs once after a custom entry was removed.
pub type CleanupFn = dyn Fn(&Maps);

/// A caller-supplied callback with an explicit name.
#[derive(Clone)]
pub struct CustomHandler {
    name: CompactString,
    multi_attach: bool,
    func: Rc<HandlerFn>,
    cleanup: Option<Rc<CleanupFn>>,
}

impl CustomHandler {
    pub fn new<N, F>(name: N, func: F) -> Self
    where
        N: Into<CompactString>,
        F: Fn(&Maps, &CallbackArgs<'_>) -> CallbackResult<()> + 'static,
    {
        Self {
            name: name.into(),
            multi_attach: false,
            func: Rc::new(func),
            cleanup: None,
        }
    }

    /// Allow several attachments of this name to one bucket.
    #[must_use]
    pub fn allow_multiple(mut self) -> Self {
        self.multi_attach = true;
        self
    }

    #[must_use]
    pub fn on_remove<F>(mut self, cleanup: F) -> Self
    where
        F: Fn(&Maps) + 'static,
    {
        self.cleanup = Some(Rc::new(cleanup));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandler")
            .field("name", &self.name)
            .field("multi_attach", &self.multi_attach)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Handler {
    Builtin(BuiltinCallback),
    Custom(CustomHandler),
}

impl Handler {
    pub fn base_name(&self) -> &str {
        match self {
            Self::Builtin(cb) => cb.kind().name(),
            Self::Custom(custom) => custom.name(),
        }
    }

    pub fn multi_attach(&self) -> bool {
        match self {
            Self::Builtin(cb) => cb.kind().multi_attach(),
            Self::Custom(custom) => custom.multi_attach,
        }
    }

    pub(crate) fn invoke(&self, maps: &Maps, args: &CallbackArgs<'_>) -> CallbackResult<()> {
        match self {
            Self::Builtin(cb) => cb.invoke(maps, args.payload),
            Self::Custom(custom) => (custom.func)(maps, args),
        }
    }

    pub(crate) fn cleanup(&self, maps: &Maps, class: EventClass) {
        match self {
            Self::Builtin(cb) => cb.cleanup(maps, class),
            Self::Custom(custom) => {
                if let Some(cleanup) = &custom.cleanup {
                    cleanup(maps);
                }
            }
        }
    }
}

/// One attachment: handler, bound arguments and identity.
#[derive(Debug, Clone)]
pub struct CallbackEntry {
    pub id: CallbackId,
    pub handler: Handler,
    pub bound: BoundArgs,
}

type Bucket = IndexMap<EntryKey, CallbackEntry>;

#[derive(Debug)]
pub struct CallbackRegistry {
    class: EventClass,
    buckets: IndexMap<Classifier, Bucket>,
}

impl CallbackRegistry {
    pub fn new(class: EventClass) -> Self {
        Self {
            class,
            buckets: IndexMap::new(),
        }
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    /// Validate and store a new entry, returning its identity.
    pub fn insert(
        &mut self,
        classifier: Classifier,
        handler: Handler,
        bound: BoundArgs,
    ) -> CallbackResult<CallbackId> {
        if !classifier.matches(self.class) {
            return Err(CallbackError::ClassifierMismatch {
                classifier: classifier.to_string(),
                class: self.class,
            });
        }

        let base_name = handler.base_name();
        validate_base_name(base_name)?;
        bound.check_reserved()?;

        let sequence = match self.buckets.get(&classifier) {
            Some(bucket) => {
                let used: Vec<u32> = bucket
                    .keys()
                    .filter(|key| key.base_name == base_name)
                    .map(|key| key.sequence)
                    .collect();

                if !used.is_empty() && !handler.multi_attach() {
                    return Err(CallbackError::DuplicateAttachment {
                        name: base_name.into(),
                        classifier: classifier.to_string(),
                    });
                }

                (0..).find(|seq| !used.contains(seq)).unwrap_or_default()
            }
            None => 0,
        };

        let key = EntryKey::new(base_name, sequence);
        let id = CallbackId::new(key.clone(), classifier.clone());

        self.buckets.entry(classifier).or_default().insert(
            key,
            CallbackEntry {
                id: id.clone(),
                handler,
                bound,
            },
        );

        debug!(class = %self.class, %id, "callback attached");
        Ok(id)
    }

    /// Delete an entry; empty buckets are dropped with it.
    pub fn remove(&mut self, id: &CallbackId) -> Option<CallbackEntry> {
        let bucket = self.buckets.get_mut(&id.classifier)?;
        let entry = bucket.shift_remove(&id.key)?;
        if bucket.is_empty() {
            self.buckets.shift_remove(&id.classifier);
        }
        Some(entry)
    }

    pub fn get(&self, id: &CallbackId) -> Option<&CallbackEntry> {
        self.buckets.get(&id.classifier)?.get(&id.key)
    }

    /// Identities of all entries in insertion order.
    pub fn ids(&self) -> Vec<CallbackId> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.values().map(|entry| entry.id.clone()))
            .collect()
    }

    /// Snapshot of one bucket in execution order.
    pub fn ordered(&self, classifier: &Classifier, policy: &OrderingPolicy) -> Vec<CallbackEntry> {
        let Some(bucket) = self.buckets.get(classifier) else {
            return Vec::new();
        };

        let mut entries: Vec<&CallbackEntry> = bucket.values().collect();
        entries.sort_by(|a, b| policy.compare(&a.id.key, &b.id.key));
        entries.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Remove every entry, returning them in insertion order.
    pub fn drain(&mut self) -> Vec<CallbackEntry> {
        self.buckets
            .drain(..)
            .flat_map(|(_, bucket)| bucket.into_values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::catalog::MarkSpec;
    use crate::model::identity::MouseButton;

    fn mark() -> Handler {
        Handler::Builtin(BuiltinCallback::Mark(MarkSpec::default()))
    }

    fn custom(name: &str) -> Handler {
        Handler::Custom(CustomHandler::new(name, |_, _| Ok(())))
    }

    #[test]
    fn test_multi_attach_allocates_sequences() {
        let mut registry = CallbackRegistry::new(EventClass::Click);
        let first = registry.insert(Classifier::default(), mark(), BoundArgs::new()).unwrap();
        let second = registry.insert(Classifier::default(), mark(), BoundArgs::new()).unwrap();

        assert_eq!(first.to_string(), "mark_0__single__1");
        assert_eq!(second.to_string(), "mark_1__single__1");
        assert_eq!(registry.ids(), vec![first.clone(), second.clone()]);

        assert!(registry.remove(&first).is_some());
        assert_eq!(registry.ids(), vec![second]);

        // The freed sequence is reused.
        let third = registry.insert(Classifier::default(), mark(), BoundArgs::new()).unwrap();
        assert_eq!(third.sequence(), 0);
    }

    #[test]
    fn test_duplicate_rejected_without_partial_state() {
        let mut registry = CallbackRegistry::new(EventClass::Click);
        registry
            .insert(
                Classifier::default(),
                Handler::Builtin(BuiltinCallback::GetValues),
                BoundArgs::new(),
            )
            .unwrap();
        let err = registry
            .insert(
                Classifier::default(),
                Handler::Builtin(BuiltinCallback::GetValues),
                BoundArgs::new(),
            )
            .unwrap_err();

        assert!(matches!(err, CallbackError::DuplicateAttachment { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_name_in_other_bucket_is_independent() {
        let mut registry = CallbackRegistry::new(EventClass::Pick);
        let a = registry.insert(Classifier::default(), custom("load"), BoundArgs::new()).unwrap();
        let b = registry
            .insert(Classifier::double(MouseButton::RIGHT), custom("load"), BoundArgs::new())
            .unwrap();
        assert_eq!(a.sequence(), 0);
        assert_eq!(b.to_string(), "load_0__double__3");
    }

    #[test]
    fn test_insert_validation() {
        let mut registry = CallbackRegistry::new(EventClass::Keypress);
        assert!(matches!(
            registry.insert(Classifier::default(), custom("cb"), BoundArgs::new()),
            Err(CallbackError::ClassifierMismatch { .. })
        ));
        assert!(matches!(
            registry.insert(Classifier::key("a"), custom("bad__name"), BoundArgs::new()),
            Err(CallbackError::ReservedSeparator(_))
        ));
        assert!(matches!(
            registry.insert(Classifier::key("a"), custom("cb"), BoundArgs::new().with("key", "b")),
            Err(CallbackError::ReservedArgument(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = CallbackRegistry::new(EventClass::Keypress);
        let id = registry.insert(Classifier::key("a"), custom("cb"), BoundArgs::new()).unwrap();
        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ordered_snapshot() {
        let mut registry = CallbackRegistry::new(EventClass::Click);
        let policy = OrderingPolicy::for_class(EventClass::Click);
        registry.insert(Classifier::default(), custom("zeta"), BoundArgs::new()).unwrap();
        registry.insert(Classifier::default(), mark(), BoundArgs::new()).unwrap();
        registry
            .insert(
                Classifier::default(),
                Handler::Builtin(BuiltinCallback::ClearMarkers),
                BoundArgs::new(),
            )
            .unwrap();
        registry.insert(Classifier::default(), custom("alpha"), BoundArgs::new()).unwrap();

        let names: Vec<String> = registry
            .ordered(&Classifier::default(), &policy)
            .iter()
            .map(|e| e.id.key.to_string())
            .collect();
        assert_eq!(names, ["clear_markers_0", "mark_0", "alpha_0", "zeta_0"]);

        let again: Vec<String> = registry
            .ordered(&Classifier::default(), &policy)
            .iter()
            .map(|e| e.id.key.to_string())
            .collect();
        assert_eq!(names, again);
        assert!(registry.ordered(&Classifier::double(MouseButton::LEFT), &policy).is_empty());
    }
}
