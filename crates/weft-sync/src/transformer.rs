//! Journal rebase.
//!
//! Every operation in the log was made against its `basis`, but it is
//! applied at `version`. The operations accepted in between were unknown to
//! its author, so before it can be applied at `version` it must be merged
//! past each of them. The [`Transformer`] keeps the raw journal plus two
//! memo tables:
//!
//! - `transformed[v]`: operation `v` re-expressed to apply right after `v-1`
//! - `merge[v]`: the operations between `basis(v)` and `v`, each re-expressed
//!   to apply after operation `v` (the merge chain)
//!
//! When an operation names a parent in the same range, the parent's merge
//! chain is reused: the parent already absorbed everything before it, so only
//! the chain entries the child had not seen need merging.

use crate::error::{Result, SyncError};
use crate::operation::Operation;
use std::collections::{BTreeMap, HashMap};

/// Rebases log operations onto the versions they were accepted at.
#[derive(Debug, Default)]
pub struct Transformer {
    journal: BTreeMap<i64, Operation>,
    transformed: HashMap<i64, Operation>,
    merge: HashMap<i64, Vec<Operation>>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add raw log operations to the journal.
    pub fn record(&mut self, ops: &[Operation]) {
        for op in ops.iter().filter(|op| op.version >= 0) {
            self.journal.entry(op.version).or_insert_with(|| op.clone());
        }
    }

    /// Record `ops` and return each of them transformed to apply at its
    /// own version.
    pub fn rebase(&mut self, ops: &[Operation]) -> Result<Vec<Operation>> {
        self.record(ops);
        ops.iter()
            .map(|op| self.transform_and_cache(op.version).map(|(xform, _)| xform))
            .collect()
    }

    pub fn transformed(&self, version: i64) -> Option<&Operation> {
        self.transformed.get(&version)
    }

    pub fn merge_chain(&self, version: i64) -> Option<&[Operation]> {
        self.merge.get(&version).map(Vec::as_slice)
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Forget everything below `version`.
    pub fn prune_before(&mut self, version: i64) {
        self.journal = self.journal.split_off(&version);
        self.transformed.retain(|v, _| *v >= version);
        self.merge.retain(|v, _| *v >= version);
    }

    fn transform_and_cache(&mut self, version: i64) -> Result<(Operation, Vec<Operation>)> {
        if let Some(xform) = self.transformed.get(&version) {
            let merge = self.merge.get(&version).cloned().unwrap_or_default();
            return Ok((xform.clone(), merge));
        }

        let op = self
            .journal
            .get(&version)
            .cloned()
            .ok_or(SyncError::UnresolvableRebase {
                version,
                missing: version,
            })?;
        let (xform, merge) = self.transform(&op)?;
        self.transformed.insert(version, xform.clone());
        self.merge.insert(version, merge.clone());
        Ok((xform, merge))
    }

    fn transform(&mut self, op: &Operation) -> Result<(Operation, Vec<Operation>)> {
        if op.version - op.basis - 1 <= 0 {
            return Ok((op.clone(), Vec::new()));
        }

        let mut between = Vec::new();
        for v in (op.basis + 1)..op.version {
            match self.journal.get(&v) {
                Some(x) => between.push((x.id.clone(), x.version)),
                None => {
                    return Err(SyncError::UnresolvableRebase {
                        version: op.version,
                        missing: v,
                    })
                }
            }
        }

        let mut xform = op.clone();
        let mut merge = Vec::new();
        let mut rest = between.as_slice();

        let parent = op
            .parent_id
            .as_ref()
            .and_then(|pid| between.iter().position(|(id, _)| id == pid));
        if let Some(pos) = parent {
            rest = &between[pos + 1..];
            (xform, merge) = self.merge_chain_after_parent(op, between[pos].1)?;
        }

        for &(_, version) in rest {
            let (x, _) = self.transform_and_cache(version)?;
            let (next, x) = x.merge(&xform);
            xform = next;
            merge.push(x);
        }

        tracing::trace!(version = op.version, merged = merge.len(), "transformed operation");
        Ok((xform, merge))
    }

    /// Merge `op` past the entries of its parent's merge chain that it had
    /// not already seen.
    fn merge_chain_after_parent(&mut self, op: &Operation, parent: i64) -> Result<(Operation, Vec<Operation>)> {
        let (_, mut merge) = self.transform_and_cache(parent)?;
        let seen = merge.iter().take_while(|m| m.version <= op.basis).count();
        merge.drain(..seen);

        let mut xform = op.clone();
        for m in merge.iter_mut() {
            let (next, mx) = m.merge(&xform);
            xform = next;
            *m = mx;
        }
        Ok((xform, merge))
    }
}
