//! Branches that exchange changes with their parent on demand.

use crate::stream::Stream;
use parking_lot::Mutex;
use std::sync::Arc;

/// The two cursors a branch keeps: how far the parent has been pulled and
/// how far the child has been pushed.
#[derive(Debug)]
pub(crate) struct BranchState {
    parent: Stream,
    child: Stream,
}

impl Stream {
    /// Start a branch at this version.
    ///
    /// Appends on the branch do not reach this stream until the branch is
    /// pushed, and appends here do not reach the branch until it is pulled.
    pub fn branch(&self) -> Stream {
        let root = Stream::new(self.value.clone());
        let state = BranchState {
            parent: self.clone(),
            child: root.clone(),
        };
        Stream {
            branch: Some(Arc::new(Mutex::new(state))),
            ..root
        }
    }

    /// Send every change appended on this branch since the last push to
    /// the parent.
    pub fn push(&self) -> Stream {
        let Some(branch) = &self.branch else {
            return self.clone();
        };
        let mut state = branch.lock();
        let mut pushed = 0usize;
        while let Some((change, next)) = state.child.next() {
            state.parent = state.parent.append_opt(change);
            state.child = next;
            pushed += 1;
        }
        tracing::debug!(pushed, "pushed branch changes to parent");
        self.clone()
    }

    /// Bring every change appended on the parent since the last pull into
    /// this branch.
    pub fn pull(&self) -> Stream {
        let Some(branch) = &self.branch else {
            return self.clone();
        };
        let mut state = branch.lock();
        let mut pulled = 0usize;
        while let Some((change, next)) = state.parent.next() {
            state.child = state.child.reverse_append_opt(change);
            state.parent = next;
            pulled += 1;
        }
        tracing::debug!(pulled, "pulled parent changes into branch");
        self.clone()
    }
}
