//! Changes addressed to a nested value.

use crate::change::{self, swap, Change, Merged, Replace};
use crate::value::Key;

/// Apply `change` to the value reached by descending `path`.
///
/// An empty path addresses the root.
#[derive(Clone, Debug, PartialEq)]
pub struct PathChange {
    pub path: Vec<Key>,
    pub change: Option<Box<Change>>,
}

impl PathChange {
    pub fn new(path: Vec<Key>, change: Option<Change>) -> Self {
        Self {
            path,
            change: change.map(Box::new),
        }
    }

    /// Normalising constructor: an empty path yields the bare change, a
    /// missing change yields nothing, nested path changes are flattened.
    pub fn create(path: Vec<Key>, change: Option<Change>) -> Option<Change> {
        if path.is_empty() {
            return change;
        }
        match change? {
            Change::Path(inner) => {
                let mut joined = path;
                joined.extend(inner.path);
                PathChange::create(joined, inner.change.map(|c| *c))
            }
            other => Some(Change::Path(PathChange::new(path, Some(other)))),
        }
    }

    pub fn revert(&self) -> Option<Change> {
        let inner = self.change.as_deref()?.revert();
        PathChange::create(self.path.clone(), inner)
    }

    fn common_prefix_len(&self, other: &[Key]) -> usize {
        self.path
            .iter()
            .zip(other)
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub(crate) fn merge(&self, this: &Change, other: &Change) -> Merged {
        let Some(inner) = self.change.as_deref() else {
            return (Some(other.clone()), None);
        };
        if self.path.is_empty() {
            return inner.merge(Some(other));
        }

        let (other_path, other_change): (&[Key], Option<&Change>) = match other {
            Change::Path(p) => (&p.path, p.change.as_deref()),
            _ => (&[], Some(other)),
        };

        let len = self.common_prefix_len(other_path);
        let own_len = self.path.len();
        let other_len = other_path.len();

        if len != own_len && len != other_len {
            return (Some(other.clone()), Some(this.clone()));
        }

        if len == own_len && len == other_len {
            let (left, right) = inner.merge(other_change);
            return (
                PathChange::create(other_path.to_vec(), left),
                PathChange::create(self.path.clone(), right),
            );
        }

        if len == own_len {
            let suffix = PathChange::create(other_path[len..].to_vec(), other_change.cloned());
            let (left, right) = inner.merge(suffix.as_ref());
            return (
                PathChange::create(self.path.clone(), left),
                PathChange::create(self.path.clone(), right),
            );
        }

        match other {
            Change::Path(p) => swap(p.merge(other, this)),
            _ => swap(other.merge(Some(this))),
        }
    }

    pub(crate) fn reverse_merge(&self, this: &Change, other: &Change) -> Merged {
        if self.path.is_empty() {
            return swap(other.merge(self.change.as_deref()));
        }
        if let Change::Replace(r) = other {
            let before = r.before.apply(this);
            return (
                Some(Change::Replace(Replace::new(before, r.after.clone()))),
                None,
            );
        }
        swap(change::merge(Some(other), Some(this)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn set(path: &[&str], before: i64, after: i64) -> Change {
        Change::Path(PathChange::new(
            path.iter().map(|k| Key::from(*k)).collect(),
            Some(Change::Replace(Replace::new(Value::int(before), Value::int(after)))),
        ))
    }

    #[test]
    fn test_create_normalises() {
        assert_eq!(PathChange::create(vec![Key::from("a")], None), None);
        let inner = set(&["b"], 1, 2);
        assert_eq!(PathChange::create(vec![], Some(inner.clone())), Some(inner.clone()));
        assert_eq!(
            PathChange::create(vec![Key::from("a")], Some(inner)),
            Some(set(&["a", "b"], 1, 2))
        );
    }

    #[test]
    fn test_same_path_merges_inner_changes() {
        let a = set(&["x"], 1, 2);
        let b = set(&["x"], 1, 3);
        let (b_after_a, a_after_b) = a.merge(Some(&b));
        assert_eq!(b_after_a, Some(set(&["x"], 2, 3)));
        assert_eq!(a_after_b, None);
    }

    #[test]
    fn test_prefix_path_recurses_into_suffix() {
        let outer = Change::Path(PathChange::new(
            vec![Key::from("doc")],
            Some(Change::Replace(Replace::new(Value::Null, Value::int(7)))),
        ));
        let nested = set(&["doc", "title"], 1, 2);
        let (nested_after, outer_after) = outer.merge(Some(&nested));
        assert_eq!(nested_after, None);
        match outer_after {
            Some(Change::Path(p)) => assert_eq!(p.path, vec![Key::from("doc")]),
            other => panic!("unexpected merge result: {:?}", other),
        }

        let (outer_after2, nested_after2) = nested.merge(Some(&outer));
        assert_eq!(nested_after2, None);
        assert!(matches!(outer_after2, Some(Change::Path(_))));
    }

    #[test]
    fn test_revert_round_trips() {
        let a = set(&["x", "y"], 1, 2);
        assert_eq!(a.revert(), Some(set(&["x", "y"], 2, 1)));
        assert_eq!(a.revert().and_then(|r| r.revert()), Some(a));
    }
}
