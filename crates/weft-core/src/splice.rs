//! Sub-sequence replacement for text and lists.

use crate::change::{Change, Merged, PathChange, MAX_POSITION};
use crate::value::{Key, Value};

/// Replace `before`, found at `offset`, with `after`.
#[derive(Clone, Debug, PartialEq)]
pub struct Splice {
    pub offset: i64,
    pub before: Value,
    pub after: Value,
}

impl Splice {
    pub fn new(offset: i64, before: Value, after: Value) -> Self {
        Self {
            offset,
            before,
            after,
        }
    }

    pub fn revert(&self) -> Splice {
        Splice::new(self.offset, self.after.clone(), self.before.clone())
    }

    fn end(&self) -> i64 {
        self.offset.saturating_add(self.before.len() as i64)
    }

    fn diff(&self) -> i64 {
        self.after.len() as i64 - self.before.len() as i64
    }

    /// Position of list index `idx` after this splice; `None` when the index
    /// falls inside the replaced region.
    pub fn map_index(&self, idx: i64) -> Option<i64> {
        if idx < self.offset {
            Some(idx)
        } else if idx >= self.end() {
            Some(idx.saturating_add(self.diff()))
        } else {
            None
        }
    }

    pub(crate) fn merge_path(&self, o: &PathChange) -> Merged {
        let unchanged = (Some(Change::Path(o.clone())), Some(Change::Splice(self.clone())));
        let Some(idx) = o
            .path
            .first()
            .and_then(Key::as_index)
            .filter(|i| (-MAX_POSITION..=MAX_POSITION).contains(i))
        else {
            return unchanged;
        };

        match self.map_index(idx) {
            Some(mapped) if mapped == idx => unchanged,
            Some(mapped) => {
                let mut path = o.path.clone();
                path[0] = Key::Int(mapped);
                (
                    Some(Change::Path(PathChange {
                        path,
                        change: o.change.clone(),
                    })),
                    Some(Change::Splice(self.clone())),
                )
            }
            None => {
                let mut path = o.path.clone();
                path[0] = Key::Int(idx - self.offset);
                let inner = Change::Path(PathChange {
                    path,
                    change: o.change.clone(),
                });
                let before = self.before.apply(&inner);
                (
                    None,
                    Some(Change::Splice(Splice::new(
                        self.offset,
                        before,
                        self.after.clone(),
                    ))),
                )
            }
        }
    }

    pub(crate) fn merge_splice(&self, o: &Splice) -> Merged {
        let this_len = self.before.len() as i64;
        let o_len = o.before.len() as i64;

        if self.end() <= o.offset {
            // [ ] < >
            let other = Splice::new(o.offset + self.diff(), o.before.clone(), o.after.clone());
            return (Some(other.into()), Some(self.clone().into()));
        }

        if o.end() <= self.offset {
            // < > [ ]
            let updated = Splice::new(self.offset + o.diff(), self.before.clone(), self.after.clone());
            return (Some(o.clone().into()), Some(updated.into()));
        }

        if self.offset < o.offset && self.end() < o.end() {
            // [ < ] >
            let o_offset = self.offset + self.after.len() as i64;
            let o_before = o.before.slice(self.end() - o.offset, o_len);
            let before = self.before.slice(0, o.offset - self.offset);
            return (
                Some(Splice::new(o_offset, o_before, o.after.clone()).into()),
                Some(Splice::new(self.offset, before, self.after.clone()).into()),
            );
        }

        if self.offset == o.offset && this_len < o_len {
            // <[ ] >
            let o_before = o.before.slice(this_len, o_len);
            let o_offset = o.offset + self.after.len() as i64;
            return (
                Some(Splice::new(o_offset, o_before, o.after.clone()).into()),
                Some(Splice::new(self.offset, self.before.slice(0, 0), self.after.clone()).into()),
            );
        }

        if self.offset <= o.offset && self.end() >= o.end() {
            // [ < > ]
            let diff = o.offset - self.offset;
            let slice = self.before.slice(diff, diff + o_len);
            let inner = Change::Splice(Splice::new(diff, slice, o.after.clone()));
            let before = self.before.apply(&inner);
            return (
                None,
                Some(Splice::new(self.offset, before, self.after.clone()).into()),
            );
        }

        if self.offset > o.offset && self.end() <= o.end() {
            // < [ ] >
            let diff = self.offset - o.offset;
            let slice = o.before.slice(diff, diff + this_len);
            let inner = Change::Splice(Splice::new(diff, slice, self.after.clone()));
            let o_before = o.before.apply(&inner);
            return (
                Some(Splice::new(o.offset, o_before, o.after.clone()).into()),
                None,
            );
        }

        // < [ > ]
        let o_before = o.before.slice(0, self.offset - o.offset);
        let offset = o.offset + o.after.len() as i64;
        let before = self.before.slice(o.end() - self.offset, this_len);
        (
            Some(Splice::new(o.offset, o_before, o.after.clone()).into()),
            Some(Splice::new(offset, before, self.after.clone()).into()),
        )
    }
}
