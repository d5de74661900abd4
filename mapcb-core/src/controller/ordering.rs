//! Deterministic execution order of the entries in one bucket.

use std::cmp::Ordering;

use crate::controller::catalog::HandlerKind;
use crate::model::identity::{EntryKey, EventClass};

/// Catalog names run first in declaration order, then all other names
/// lexicographically; equal names run by ascending sequence.
#[derive(Debug, Clone, Copy)]
pub struct OrderingPolicy {
    canonical: &'static [HandlerKind],
}

impl OrderingPolicy {
    pub const fn for_class(class: EventClass) -> Self {
        Self {
            canonical: HandlerKind::catalog(class),
        }
    }

    fn rank(&self, base_name: &str) -> Option<usize> {
        self.canonical.iter().position(|kind| kind.name() == base_name)
    }

    pub fn compare(&self, a: &EntryKey, b: &EntryKey) -> Ordering {
        let by_name = match (self.rank(&a.base_name), self.rank(&b.base_name)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.base_name.cmp(&b.base_name),
        };
        by_name.then(a.sequence.cmp(&b.sequence))
    }

    /// Sort `keys` into execution order.
    pub fn sort<'a, I>(&self, keys: I) -> Vec<&'a EntryKey>
    where
        I: IntoIterator<Item = &'a EntryKey>,
    {
        let mut keys: Vec<_> = keys.into_iter().collect();
        keys.sort_by(|a, b| self.compare(a, b));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[(&str, u32)]) -> Vec<EntryKey> {
        names.iter().map(|(n, s)| EntryKey::new(*n, *s)).collect()
    }

    fn order(policy: &OrderingPolicy, keys: &[EntryKey]) -> Vec<String> {
        policy.sort(keys).into_iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_catalog_before_custom() {
        let policy = OrderingPolicy::for_class(EventClass::Click);
        let input = keys(&[
            ("peek_layer", 0),
            ("my_cb", 0),
            ("mark", 1),
            ("clear_annotations", 0),
            ("mark", 0),
            ("abc", 0),
        ]);
        assert_eq!(
            order(&policy, &input),
            ["clear_annotations_0", "mark_0", "mark_1", "peek_layer_0", "abc_0", "my_cb_0"]
        );
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let policy = OrderingPolicy::for_class(EventClass::Pick);
        let mut input = keys(&[("get_values", 0), ("x", 2), ("x", 0), ("annotate", 0)]);
        let first = order(&policy, &input);
        input.reverse();
        assert_eq!(first, order(&policy, &input));
        assert_eq!(first, ["get_values_0", "annotate_0", "x_0", "x_2"]);
    }

    #[test]
    fn test_keypress_catalog() {
        let policy = OrderingPolicy::for_class(EventClass::Keypress);
        // `mark` is not a keypress catalog name and sorts like any custom name.
        let input = keys(&[("mark", 0), ("switch_layer", 0), ("annotate", 0)]);
        assert_eq!(order(&policy, &input), ["switch_layer_0", "annotate_0", "mark_0"]);
    }
}
