//! Sequential composition of changes.

use crate::change::{Change, Merged};

/// Changes applied one after the other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changes(Vec<Change>);

impl Changes {
    /// Build a collection, flattening nested collections.
    pub fn new(changes: Vec<Change>) -> Self {
        let mut all = Vec::with_capacity(changes.len());
        for c in changes {
            match c {
                Change::Changes(inner) => all.extend(inner.0),
                other => all.push(other),
            }
        }
        Self(all)
    }

    /// Like [`Changes::new`] but collapses an empty collection to `None`.
    pub fn create(changes: Vec<Change>) -> Option<Change> {
        let all = Changes::new(changes);
        if all.0.is_empty() {
            None
        } else {
            Some(Change::Changes(all))
        }
    }

    /// Collect the present changes of a sequence of optional ones.
    pub fn join(changes: impl IntoIterator<Item = Option<Change>>) -> Option<Change> {
        Changes::create(changes.into_iter().flatten().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn revert(&self) -> Option<Change> {
        Changes::create(self.0.iter().rev().filter_map(Change::revert).collect())
    }

    pub(crate) fn merge(&self, other: &Change) -> Merged {
        let mut other = Some(other.clone());
        let mut result = Vec::with_capacity(self.0.len());
        for c in &self.0 {
            let (o, cx) = c.merge(other.as_ref());
            other = o;
            result.extend(cx);
        }
        (other, Changes::create(result))
    }

    pub(crate) fn reverse_merge(&self, other: &Change) -> Merged {
        let mut other = Some(other.clone());
        let mut result = Vec::with_capacity(self.0.len());
        for c in &self.0 {
            let mut c = Some(c.clone());
            if let Some(o) = &other {
                let (cx, ox) = o.merge(c.as_ref());
                c = cx;
                other = ox;
            }
            result.extend(c);
        }
        (other, Changes::create(result))
    }
}

impl IntoIterator for Changes {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
