//! Relocation of a contiguous run within text or a list.

use crate::change::{swap, Change, Changes, Merged, PathChange, Splice, MAX_POSITION};
use crate::value::Key;

/// Shift `count` elements starting at `offset` over `distance` positions.
///
/// `Move::new(1, 2, -1)` removes the slice `[1, 3)` and re-inserts it at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub offset: i64,
    pub count: i64,
    pub distance: i64,
}

fn some(m: Move) -> Option<Change> {
    Some(Change::Move(m))
}

impl Move {
    pub fn new(offset: i64, count: i64, distance: i64) -> Self {
        Self {
            offset,
            count,
            distance,
        }
    }

    pub fn revert(&self) -> Move {
        Move::new(self.offset.saturating_add(self.distance), self.count, self.distance.saturating_neg())
    }

    /// Post-move position of the element at `idx`.
    pub fn map_index(&self, idx: i64) -> i64 {
        if idx >= self.offset && idx < self.offset + self.count {
            return idx + self.distance;
        }
        if self.distance > 0 {
            let end = self.offset + self.count + self.distance;
            if idx >= self.offset + self.count && idx < end {
                return idx - self.count;
            }
        } else if idx >= self.offset + self.distance && idx < self.offset {
            return idx + self.count;
        }
        idx
    }

    fn map_point(&self, idx: i64) -> i64 {
        if idx >= self.offset + self.distance && idx <= self.offset {
            return idx + self.count;
        }
        if idx >= self.offset + self.count && idx < self.offset + self.count + self.distance {
            return idx - self.count;
        }
        idx
    }

    fn dest(&self) -> i64 {
        if self.distance < 0 {
            self.offset + self.distance
        } else {
            self.offset + self.distance + self.count
        }
    }

    fn contains(&self, p: i64) -> bool {
        p > self.offset && p < self.offset + self.count
    }

    fn with_dest(offset: i64, count: i64, dest: i64) -> Move {
        let mut distance = dest - offset - count;
        if distance < 0 {
            distance = dest - offset;
        }
        Move::new(offset, count, distance)
    }

    pub(crate) fn merge_path(&self, o: &PathChange) -> Merged {
        let mut path = o.path.clone();
        let idx = path
            .first()
            .and_then(Key::as_index)
            .filter(|i| (-MAX_POSITION..=MAX_POSITION).contains(i));
        if let Some(idx) = idx {
            path[0] = Key::Int(self.map_index(idx));
        }
        (
            Some(Change::Path(PathChange {
                path,
                change: o.change.clone(),
            })),
            some(*self),
        )
    }

    pub(crate) fn merge_move(&self, o: &Move) -> Merged {
        if o == self {
            return (None, None);
        }

        if self.distance == 0 || self.count == 0 || o.distance == 0 || o.count == 0 {
            return (some(*o), some(*self));
        }

        if self.offset >= o.offset + o.count || o.offset >= self.offset + self.count {
            return self.merge_no_overlap(o);
        }

        if self.offset <= o.offset && self.offset + self.count >= o.offset + o.count {
            return self.merge_contained(o);
        }

        if self.offset >= o.offset && self.offset + self.count <= o.offset + o.count {
            return swap(o.merge_move(self));
        }

        if self.offset < o.offset {
            return self.merge_right_overlap(o);
        }

        swap(o.merge_move(self))
    }

    fn merge_no_overlap(&self, o: &Move) -> Merged {
        let dest = self.dest();
        let odest = o.dest();

        if !self.contains(odest) && !o.contains(dest) {
            return self.merge_no_dest_mixups(o);
        }

        if self.contains(odest) && o.contains(dest) {
            return self.merge_mixed_dests(o);
        }

        if o.contains(dest) {
            return swap(o.merge_move(self));
        }

        self.merge_contained_dest(o)
    }

    fn merge_contained_dest(&self, o: &Move) -> Merged {
        let dest = self.dest();
        let mut odest = o.dest();

        let mut destx = dest;
        if dest >= odest && dest <= o.offset {
            destx += o.count;
        } else if dest > o.offset && dest <= odest {
            destx -= o.count;
        }

        let mut m1 = Move::new(self.offset, self.count + o.count, self.distance);
        if o.offset <= self.offset {
            m1.offset -= o.count;
        }
        m1.distance = if destx <= m1.offset {
            destx - m1.offset
        } else {
            destx - m1.offset - m1.count
        };

        let mut o1 = *o;
        if o.offset > self.offset && o.offset < dest {
            o1.offset -= self.count;
        } else if o.offset >= dest && o.offset < self.offset {
            o1.offset += self.count;
        }

        odest += self.distance;
        o1.distance = if odest <= o1.offset {
            odest - o1.offset
        } else {
            odest - o1.offset - o1.count
        };

        (some(o1), some(m1))
    }

    fn merge_no_dest_mixups(&self, o: &Move) -> Merged {
        let dest = self.dest();
        let odest = o.dest();

        let o1dest = if odest == dest {
            self.offset + self.distance
        } else {
            self.map_point(odest)
        };
        let o1 = Move::with_dest(self.map_point(o.offset), o.count, o1dest);

        let m1dest = o.map_point(dest);
        let m1 = Move::with_dest(o.map_point(self.offset), self.count, m1dest);

        (some(o1), some(m1))
    }

    fn merge_mixed_dests(&self, o: &Move) -> Merged {
        let dest = self.dest();
        let odest = o.dest();

        let lcount = dest - o.offset;
        let rcount = o.count - lcount;

        let loffset = self.offset + self.distance - lcount;
        let roffset = self.offset + self.distance + self.count;

        let ldistance = odest - self.offset;
        let rdistance = odest - self.offset - self.count;
        let ox = Changes::create(vec![
            Move::new(loffset, lcount, ldistance).into(),
            Move::new(roffset, rcount, rdistance).into(),
        ]);

        let mut distance = o.offset - self.offset - self.count;
        if distance < 0 {
            distance = -(self.offset - o.offset - o.count);
        }
        let offset = o.offset + o.distance - (odest - self.offset);
        let count = self.count + o.count;

        (ox, some(Move::new(offset, count, distance)))
    }

    fn merge_right_overlap(&self, o: &Move) -> Merged {
        let overlap = self.offset + self.count - o.offset;
        let mut undo = Move::new(o.offset + o.distance, overlap, 0);
        let mut rest = Move::new(o.offset + overlap, o.count - overlap, 0);

        if o.distance > 0 {
            undo.distance = -o.distance;
            rest.distance = o.distance;
        } else {
            undo.distance = o.count - overlap - o.distance;
            rest.distance = o.distance - overlap;
        }

        let (left, right) = self.merge_no_overlap(&rest);
        (left, Changes::join([some(undo), right]))
    }

    fn merge_contained(&self, o: &Move) -> Merged {
        let odest = o.dest();
        let mut ox = Move::new(o.offset + self.distance, o.count, o.distance);

        if self.offset <= odest && odest <= self.offset + self.count {
            return (some(ox), some(*self));
        }

        if odest == self.dest() {
            ox = Move::with_dest(ox.offset, ox.count, self.offset + self.distance);
            let mut offset = self.offset;
            if o.distance < 0 {
                offset += o.count;
            }
            let dest = o.offset + o.count + o.distance;
            return (
                some(ox),
                some(Move::with_dest(offset, self.count - o.count, dest)),
            );
        }

        ox = Move::with_dest(ox.offset, ox.count, self.map_point(odest));
        let offset = o.map_point(self.offset);
        let dest = o.map_point(self.dest());
        (
            some(ox),
            some(Move::with_dest(offset, self.count - o.count, dest)),
        )
    }

    pub(crate) fn merge_splice(&self, o: &Splice) -> Merged {
        let o_len = o.before.len() as i64;

        if self.offset >= o.offset && self.offset + self.count <= o.offset + o_len {
            return self.merge_within_splice(o);
        }

        if self.offset <= o.offset && self.offset + self.count >= o.offset + o_len {
            // splice sits inside the moved run
            let ox = Splice::new(o.offset + self.distance, o.before.clone(), o.after.clone());
            let grown = Move::new(
                self.offset,
                self.count + o.after.len() as i64 - o_len,
                self.distance,
            );
            return (Some(ox.into()), some(grown));
        }

        if self.offset >= o.offset + o_len || o.offset >= self.offset + self.count {
            return self.merge_outside_splice(o);
        }

        // partial overlap: undo the intersection, then merge the remainder
        let mut rest = *self;
        let mut undo = Move::new(self.offset + self.distance, 0, 0);

        if self.offset > o.offset {
            let left = o.offset + o_len - self.offset;
            rest.offset += left;
            rest.count -= left;
            undo.count = left;
            if self.distance < 0 {
                rest.distance -= left;
                undo.distance = self.count - self.distance - left;
            } else {
                undo.distance = -self.distance;
            }
        } else {
            let right = self.offset + self.count - o.offset;
            rest.count -= right;
            undo.count = right;
            undo.offset += rest.count;
            if self.distance < 0 {
                undo.distance = -self.distance;
            } else {
                rest.distance += right;
                undo.distance = right - self.distance - self.count;
            }
        }

        let (ox, restx) = rest.merge_outside_splice(o);
        (Changes::join([some(undo), ox]), restx)
    }

    fn merge_outside_splice(&self, o: &Splice) -> Merged {
        let o_len = o.before.len() as i64;
        let diff = o.after.len() as i64 - o_len;
        let dest = self.dest();

        if dest > o.offset && dest < o.offset + o_len {
            let right = o.offset + o_len - dest;
            let o_before1 = o.before.slice(0, dest - o.offset);
            let o_before2 = o.before.slice(dest - o.offset, dest - o.offset + right);
            let empty = o.before.slice(0, 0);
            let mut splice1 = Splice::new(o.offset, o_before1, o.after.clone());
            let splice2 = Splice::new(self.offset + self.count + self.distance, o_before2, empty);

            let mut moved = *self;
            if self.offset < o.offset {
                splice1.offset -= self.count;
                moved.distance += right + diff;
            } else {
                moved.distance += right;
                moved.offset += diff;
            }
            return (
                Changes::create(vec![splice2.into(), splice1.into()]),
                some(moved),
            );
        }

        if dest <= o.offset {
            if self.offset > o.offset {
                let s = Splice::new(o.offset + self.count, o.before.clone(), o.after.clone());
                let m = Move::new(self.offset + diff, self.count, self.distance - diff);
                return (Some(s.into()), some(m));
            }
        } else if dest >= o.offset + o_len {
            if self.offset > o.offset {
                let m = Move::new(self.offset + diff, self.count, self.distance);
                return (Some(o.clone().into()), some(m));
            }
            let s = Splice::new(o.offset - self.count, o.before.clone(), o.after.clone());
            let m = Move::new(self.offset, self.count, self.distance + diff);
            return (Some(s.into()), some(m));
        }

        (Some(o.clone().into()), some(*self))
    }

    fn merge_within_splice(&self, o: &Splice) -> Merged {
        let o_len = o.before.len() as i64;
        let dest = if self.distance > 0 {
            self.offset + self.count + self.distance
        } else {
            self.offset + self.distance
        };

        if dest >= o.offset && dest <= o.offset + o_len {
            let local = Move::new(self.offset - o.offset, self.count, self.distance);
            let o_before = o.before.apply(&local.into());
            return (
                Some(Splice::new(o.offset, o_before, o.after.clone()).into()),
                None,
            );
        }

        let empty = o.before.slice(0, 0);
        let start = self.offset - o.offset;
        let slice = o.before.slice(start, start + self.count);
        let cut = Change::Splice(Splice::new(start, slice.clone(), empty.clone()));
        let spliced = o.before.apply(&cut);

        if self.distance < 0 {
            let other = Splice::new(dest, empty, slice);
            let own = Splice::new(o.offset + self.count, spliced, o.after.clone());
            return (Some(own.into()), Some(other.into()));
        }

        let other = Splice::new(dest + o.after.len() as i64 - o_len, empty, slice);
        let own = Splice::new(o.offset, spliced, o.after.clone());
        (Some(own.into()), Some(other.into()))
    }
}
