//! The change vocabulary and its merge dispatch.
//!
//! `a.merge(Some(b))` returns `(b', a')` where `b'` is `b` re-expressed to
//! apply after `a`, and `a'` is `a` re-expressed to apply after `b`, so that
//! `v.apply(a).apply(b') == v.apply(b).apply(a')`. `reverse_merge` computes
//! the same pair with the other side taking precedence on ties.

pub use crate::changes::Changes;
pub use crate::moves::Move;
pub use crate::path::PathChange;
pub use crate::replace::Replace;
pub use crate::splice::Splice;

/// Largest offset, count or distance a sequence change may carry. No text
/// or list gets this long, so changes beyond it never apply; keeping
/// positions under it keeps merge arithmetic far from overflow.
pub const MAX_POSITION: i64 = 1 << 48;

/// Result of a merge: `(other transformed, self transformed)`.
pub type Merged = (Option<Change>, Option<Change>);

/// A change that can be applied to a [`crate::Value`].
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    Replace(Replace),
    Splice(Splice),
    Move(Move),
    Path(PathChange),
    Changes(Changes),
}

impl Change {
    /// The inverse change; `None` when the change is a no-op.
    pub fn revert(&self) -> Option<Change> {
        match self {
            Change::Replace(r) => Some(Change::Replace(r.revert())),
            Change::Splice(s) => Some(Change::Splice(s.revert())),
            Change::Move(m) => Some(Change::Move(m.revert())),
            Change::Path(p) => p.revert(),
            Change::Changes(c) => c.revert(),
        }
    }

    /// True when every position in the change is within `MAX_POSITION`.
    pub fn within_bounds(&self) -> bool {
        let bounded = |n: i64| (-MAX_POSITION..=MAX_POSITION).contains(&n);
        match self {
            Change::Replace(_) => true,
            Change::Splice(s) => bounded(s.offset),
            Change::Move(m) => bounded(m.offset) && (0..=MAX_POSITION).contains(&m.count) && bounded(m.distance),
            Change::Path(p) => p.change.as_deref().map_or(true, Change::within_bounds),
            Change::Changes(c) => c.iter().all(Change::within_bounds),
        }
    }

    pub fn merge(&self, other: Option<&Change>) -> Merged {
        let Some(other) = other else {
            return (None, Some(self.clone()));
        };
        if let Some(merged) = merge_out_of_bounds(self, other) {
            return merged;
        }

        match (self, other) {
            (Change::Replace(r), Change::Replace(o)) => r.merge_replace(o),
            (Change::Replace(r), _) => r.absorb(other),
            (Change::Changes(c), _) => c.merge(other),
            (Change::Path(p), _) => p.merge(self, other),
            (_, Change::Replace(o)) => o.supersede(self),
            (Change::Splice(s), Change::Splice(o)) => s.merge_splice(o),
            (Change::Splice(_), Change::Path(p)) | (Change::Move(_), Change::Path(p))
                if p.path.is_empty() =>
            {
                self.merge(p.change.as_deref())
            }
            (Change::Splice(s), Change::Path(p)) => s.merge_path(p),
            (Change::Move(m), Change::Path(p)) => m.merge_path(p),
            (Change::Move(m), Change::Splice(o)) => m.merge_splice(o),
            (Change::Move(m), Change::Move(o)) => m.merge_move(o),
            (Change::Splice(_), _) | (Change::Move(_), _) => swap(other.reverse_merge(Some(self))),
        }
    }

    pub fn reverse_merge(&self, other: Option<&Change>) -> Merged {
        let Some(other) = other else {
            return (None, Some(self.clone()));
        };
        if let Some(merged) = merge_out_of_bounds(self, other) {
            return merged;
        }

        match (self, other) {
            (Change::Replace(_), Change::Replace(_)) => swap(other.merge(Some(self))),
            (Change::Replace(r), _) => r.absorb(other),
            (Change::Changes(c), _) => c.reverse_merge(other),
            (Change::Path(p), _) => p.reverse_merge(self, other),
            (_, Change::Replace(o)) => o.supersede(self),
            (Change::Splice(_), Change::Path(p)) | (Change::Move(_), Change::Path(p))
                if p.path.is_empty() =>
            {
                self.reverse_merge(p.change.as_deref())
            }
            (Change::Splice(s), Change::Path(p)) => s.merge_path(p),
            (Change::Move(m), Change::Path(p)) => m.merge_path(p),
            (Change::Splice(_), Change::Splice(_)) => swap(other.merge(Some(self))),
            (Change::Move(m), Change::Splice(o)) => m.merge_splice(o),
            (Change::Splice(_), _) => swap(other.reverse_merge(Some(self))),
            (Change::Move(_), _) => swap(other.merge(Some(self))),
        }
    }
}

/// Merge two optional changes made against the same basis.
pub fn merge(left: Option<&Change>, right: Option<&Change>) -> Merged {
    match left {
        Some(l) => l.merge(right),
        None => (right.cloned(), None),
    }
}

/// A change with out-of-range positions applies as a no-op, so it merges
/// as one.
fn merge_out_of_bounds(this: &Change, other: &Change) -> Option<Merged> {
    if !other.within_bounds() {
        tracing::warn!("merging against a change with out-of-range positions");
        return Some((None, Some(this.clone())));
    }
    if !this.within_bounds() {
        tracing::warn!("merging a change with out-of-range positions");
        return Some((Some(other.clone()), None));
    }
    None
}

pub(crate) fn swap((a, b): Merged) -> Merged {
    (b, a)
}

impl From<Replace> for Change {
    fn from(r: Replace) -> Self {
        Change::Replace(r)
    }
}

impl From<Splice> for Change {
    fn from(s: Splice) -> Self {
        Change::Splice(s)
    }
}

impl From<Move> for Change {
    fn from(m: Move) -> Self {
        Change::Move(m)
    }
}

impl From<PathChange> for Change {
    fn from(p: PathChange) -> Self {
        Change::Path(p)
    }
}
