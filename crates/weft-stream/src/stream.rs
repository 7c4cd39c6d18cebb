//! Version chains.
//!
//! A [`Stream`] is a position in a chain of changes. Every node has at most
//! one outgoing link `{change, target}`; a link is written exactly once.
//! Appending to a node that already has a future walks that future and
//! builds a parallel, merged path ending at the same tip, so every stream
//! that shares the chain converges to the same latest value.
//!
//! Nodes live in an arena shared by all streams of the chain; a stream is
//! just `{arena, node index, materialized value}`.

use crate::branch::BranchState;
use crate::undo::History;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use weft_core::{Change, Value};

pub(crate) type NodeId = usize;

#[derive(Clone, Debug)]
struct Link {
    change: Option<Change>,
    target: NodeId,
}

/// Arena of chain nodes; `links[n]` is the outgoing link of node `n`.
#[derive(Debug, Default)]
pub(crate) struct Chain {
    links: Vec<Option<Link>>,
}

impl Chain {
    fn add_node(&mut self) -> NodeId {
        self.links.push(None);
        self.links.len() - 1
    }

    fn link(&self, node: NodeId) -> Option<Link> {
        self.links.get(node).cloned().flatten()
    }
}

/// A position in a version chain together with the value at that position.
#[derive(Clone)]
pub struct Stream {
    pub(crate) chain: Arc<Mutex<Chain>>,
    pub(crate) node: NodeId,
    pub(crate) value: Value,
    pub(crate) branch: Option<Arc<Mutex<BranchState>>>,
    pub(crate) history: Option<Arc<Mutex<History>>>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("node", &self.node)
            .field("value", &self.value)
            .field("branched", &self.branch.is_some())
            .field("undoable", &self.history.is_some())
            .finish()
    }
}

/// Merge an existing link's change with an incoming change.
///
/// Returns `(incoming', existing')`. A reverse merge lets the incoming
/// change take precedence on ties.
fn merge_step(existing: Option<&Change>, incoming: Option<Change>, reverse: bool) -> (Option<Change>, Option<Change>) {
    match (existing, incoming) {
        (None, incoming) => (incoming, None),
        (Some(existing), None) => (None, Some(existing.clone())),
        (Some(existing), Some(incoming)) if !reverse => existing.merge(Some(&incoming)),
        (Some(existing), Some(incoming)) => {
            let (existing2, incoming2) = incoming.merge(Some(existing));
            (incoming2, existing2)
        }
    }
}

impl Stream {
    /// Start a new chain at `value`.
    pub fn new(value: Value) -> Self {
        let mut chain = Chain::default();
        let node = chain.add_node();
        Self {
            chain: Arc::new(Mutex::new(chain)),
            node,
            value,
            branch: None,
            history: None,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// True when both streams are the same position of the same chain.
    pub fn same_version(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain) && self.node == other.node
    }

    /// The change that follows this version and the stream after it.
    pub fn next(&self) -> Option<(Option<Change>, Stream)> {
        let link = self.chain.lock().link(self.node)?;
        let value = self.value.apply_opt(link.change.as_ref());
        Some((link.change, self.at(link.target, value)))
    }

    /// Follow `next` to the end of the chain.
    pub fn latest(&self) -> Stream {
        let mut current = self.clone();
        while let Some((_, next)) = current.next() {
            current = next;
        }
        current
    }

    /// Add a local change.
    pub fn append(&self, change: Change) -> Stream {
        self.append_opt(Some(change))
    }

    /// Add a change that arrived from upstream; it wins ties against local
    /// changes already on the chain.
    pub fn reverse_append(&self, change: Change) -> Stream {
        self.reverse_append_opt(Some(change))
    }

    pub fn append_opt(&self, change: Option<Change>) -> Stream {
        match &self.history {
            Some(history) => {
                let mut history = history.lock();
                history.flush();
                let next = self.append_change(change, false);
                history.pickup_local();
                next
            }
            None => self.append_change(change, false),
        }
    }

    pub fn reverse_append_opt(&self, change: Option<Change>) -> Stream {
        match &self.history {
            Some(history) => {
                let mut history = history.lock();
                history.flush();
                let next = self.append_change(change, true);
                history.flush();
                next
            }
            None => self.append_change(change, true),
        }
    }

    fn append_change(&self, change: Option<Change>, reverse: bool) -> Stream {
        let value = self.value.apply_opt(change.as_ref());
        let mut chain = self.chain.lock();

        let result = chain.add_node();
        let mut node = self.node;
        let mut tip = result;
        let mut incoming = change;
        while let Some(link) = chain.link(node) {
            node = link.target;
            let (merged, existing) = merge_step(link.change.as_ref(), incoming, reverse);
            incoming = merged;
            let next = chain.add_node();
            chain.links[tip] = Some(Link {
                change: existing,
                target: next,
            });
            tip = next;
        }
        chain.links[node] = Some(Link {
            change: incoming,
            target: tip,
        });
        drop(chain);

        self.at(result, value)
    }

    /// Same chain and decorations, different position.
    pub(crate) fn at(&self, node: NodeId, value: Value) -> Stream {
        Stream {
            chain: Arc::clone(&self.chain),
            node,
            value,
            branch: self.branch.clone(),
            history: self.history.clone(),
        }
    }

    /// This position without branch or undo decorations.
    pub(crate) fn plain(&self) -> Stream {
        Stream {
            chain: Arc::clone(&self.chain),
            node: self.node,
            value: self.value.clone(),
            branch: None,
            history: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Splice;

    fn insert(offset: i64, text: &str) -> Change {
        Splice::new(offset, Value::text(""), Value::text(text)).into()
    }

    #[test]
    fn test_append_and_next() {
        let s0 = Stream::new(Value::text("hello"));
        assert!(s0.next().is_none());

        let s1 = s0.append(insert(5, " world"));
        assert_eq!(s1.value(), &Value::text("hello world"));

        let (change, next) = s0.next().unwrap();
        assert_eq!(change, Some(insert(5, " world")));
        assert!(next.same_version(&s1));
        assert!(s0.latest().same_version(&s1));
    }

    #[test]
    fn test_stale_appends_converge() {
        let s0 = Stream::new(Value::text("hello"));
        let s1 = s0.append(insert(5, " world"));
        let s2 = s0.append(insert(0, "oh, "));

        assert_eq!(s2.value(), &Value::text("oh, hello"));
        assert_eq!(s0.latest().value(), &Value::text("oh, hello world"));
        assert_eq!(s1.latest().value(), &Value::text("oh, hello world"));
        assert_eq!(s2.latest().value(), &Value::text("oh, hello world"));
        assert!(s1.latest().same_version(&s2.latest()));
    }

    #[test]
    fn test_reverse_append_wins_ties() {
        let s0 = Stream::new(Value::text("ab"));
        s0.append(insert(1, "L"));
        s0.reverse_append(insert(1, "R"));
        assert_eq!(s0.latest().value(), &Value::text("aRLb"));

        let t0 = Stream::new(Value::text("ab"));
        t0.append(insert(1, "L"));
        t0.append(insert(1, "R"));
        assert_eq!(t0.latest().value(), &Value::text("aLRb"));
    }

    #[test]
    fn test_null_change_links() {
        let s0 = Stream::new(Value::int(1));
        let s1 = s0.append_opt(None);
        assert_eq!(s1.value(), &Value::int(1));
        let (change, _) = s0.next().unwrap();
        assert_eq!(change, None);
    }
}
