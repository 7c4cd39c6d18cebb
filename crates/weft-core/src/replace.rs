//! Whole-value substitution.

use crate::change::{Change, Merged};
use crate::value::Value;

/// Replace one value with another. `before` is only used as merge context.
#[derive(Clone, Debug, PartialEq)]
pub struct Replace {
    pub before: Value,
    pub after: Value,
}

impl Replace {
    pub fn new(before: Value, after: Value) -> Self {
        Self { before, after }
    }

    pub fn revert(&self) -> Replace {
        Replace::new(self.after.clone(), self.before.clone())
    }

    /// True when the replacement removes the value.
    pub fn is_delete(&self) -> bool {
        self.after.is_null()
    }

    pub(crate) fn merge_replace(&self, other: &Replace) -> Merged {
        if self.is_delete() && other.is_delete() {
            return (None, None);
        }
        (
            Some(Change::Replace(Replace::new(
                self.after.clone(),
                other.after.clone(),
            ))),
            None,
        )
    }

    /// This replace against any other change: the other side is dropped and
    /// this replace is re-based on top of it.
    pub(crate) fn absorb(&self, other: &Change) -> Merged {
        let before = self.before.apply(other);
        (
            None,
            Some(Change::Replace(Replace::new(before, self.after.clone()))),
        )
    }

    /// Any other change against this replace.
    pub(crate) fn supersede(&self, other: &Change) -> Merged {
        let before = self.before.apply(other);
        (
            Some(Change::Replace(Replace::new(before, self.after.clone()))),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_replace_wins() {
        let a = Change::Replace(Replace::new(Value::int(3), Value::int(4)));
        let b = Change::Replace(Replace::new(Value::int(3), Value::int(10)));
        let (b_after_a, a_after_b) = a.merge(Some(&b));
        assert_eq!(
            b_after_a,
            Some(Change::Replace(Replace::new(Value::int(4), Value::int(10))))
        );
        assert_eq!(a_after_b, None);
    }

    #[test]
    fn test_concurrent_deletes_cancel() {
        let a = Change::Replace(Replace::new(Value::int(3), Value::Null));
        let b = Change::Replace(Replace::new(Value::int(3), Value::Null));
        assert_eq!(a.merge(Some(&b)), (None, None));
    }

    #[test]
    fn test_revert_swaps() {
        let r = Replace::new(Value::text("before"), Value::text("after"));
        assert_eq!(r.revert(), Replace::new(Value::text("after"), Value::text("before")));
        assert_eq!(r.revert().revert(), r);
    }
}
