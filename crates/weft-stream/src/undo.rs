//! Undo and redo over a stream.
//!
//! An undoable stream records the revert of every local change it appends.
//! Changes that reach the chain any other way (upstream merges, appends
//! through other handles) are not undoable; instead the recorded entries
//! are transformed past them so an undo still reverts the intended edit.

use crate::stream::Stream;
use parking_lot::Mutex;
use std::sync::Arc;
use weft_core::Change;

/// Undo and redo stacks, newest entry last.
///
/// Every entry applies at `cursor`, after the entries above it.
#[derive(Debug)]
pub(crate) struct History {
    cursor: Stream,
    undos: Vec<Change>,
    redos: Vec<Change>,
}

impl History {
    /// Transform both stacks past changes that reached the chain without
    /// going through this history.
    pub(crate) fn flush(&mut self) {
        while let Some((change, next)) = self.cursor.next() {
            self.cursor = next;
            if let Some(cx) = change {
                self.undos = transform(&self.undos, cx.clone());
                self.redos = transform(&self.redos, cx);
            }
        }
    }

    /// Record everything after the cursor as local edits.
    pub(crate) fn pickup_local(&mut self) {
        while let Some((change, next)) = self.cursor.next() {
            self.cursor = next;
            self.undos.extend(change.as_ref().and_then(Change::revert));
            self.redos.clear();
        }
    }

    /// Pop from `from`, apply it, and push its revert onto the other stack.
    fn replay(&mut self, undo: bool) -> Option<Stream> {
        self.flush();
        let (from, to) = if undo {
            (&mut self.undos, &mut self.redos)
        } else {
            (&mut self.redos, &mut self.undos)
        };
        let change = from.pop()?;
        to.extend(change.revert());
        self.cursor = self.cursor.append(change);
        Some(self.cursor.clone())
    }
}

/// Rebase every entry of `stack` past `cx`, newest first.
fn transform(stack: &[Change], cx: Change) -> Vec<Change> {
    let mut cx = Some(cx);
    let mut result = Vec::with_capacity(stack.len());
    for entry in stack.iter().rev() {
        match &cx {
            None => result.push(entry.clone()),
            Some(c) => {
                let (updated, rest) = c.merge(Some(entry));
                result.extend(updated);
                cx = rest;
            }
        }
    }
    result.reverse();
    result
}

impl Stream {
    /// A stream whose local appends can be undone.
    ///
    /// Streams derived from the returned one (`append`, `next`, `latest`)
    /// share its history.
    pub fn undoable(&self) -> Stream {
        let history = History {
            cursor: self.plain(),
            undos: Vec::new(),
            redos: Vec::new(),
        };
        Stream {
            history: Some(Arc::new(Mutex::new(history))),
            ..self.clone()
        }
    }

    /// Revert the most recent local change that has not been undone.
    ///
    /// Returns this stream unchanged when there is nothing to undo.
    pub fn undo(&self) -> Stream {
        self.replay(true)
    }

    /// Reapply the most recently undone change.
    ///
    /// Returns this stream unchanged when there is nothing to redo.
    pub fn redo(&self) -> Stream {
        self.replay(false)
    }

    fn replay(&self, undo: bool) -> Stream {
        let Some(history) = &self.history else {
            return self.clone();
        };
        let replayed = history.lock().replay(undo);
        match replayed {
            Some(cursor) => {
                tracing::debug!(undo, node = cursor.node, "replayed history entry");
                Stream {
                    branch: self.branch.clone(),
                    history: self.history.clone(),
                    ..cursor
                }
            }
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{Change, Replace, Splice, Value};

    use crate::Stream;

    fn replace(before: &str, after: &str) -> Change {
        Replace::new(Value::text(before), Value::text(after)).into()
    }

    fn insert(offset: i64, text: &str) -> Change {
        Splice::new(offset, Value::text(""), Value::text(text)).into()
    }

    #[test]
    fn test_undo_then_redo() {
        let parent = Stream::new(Value::text("before"));
        let u = parent.undoable();

        u.append(replace("before", "after"));
        assert_eq!(parent.latest().value(), &Value::text("after"));

        u.undo();
        assert_eq!(parent.latest().value(), &Value::text("before"));
        assert_eq!(u.latest().value(), &Value::text("before"));

        u.redo();
        assert_eq!(parent.latest().value(), &Value::text("after"));
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let parent = Stream::new(Value::text("before"));
        let u = parent.undoable();

        assert!(u.undo().same_version(&u));
        assert!(u.redo().same_version(&u));

        let u1 = u.append(replace("before", "after"));
        assert!(u1.redo().same_version(&u1));
        assert_eq!(u.latest().value(), &Value::text("after"));

        let u2 = u1.undo();
        assert_eq!(u2.value(), &Value::text("before"));
        assert!(u2.undo().same_version(&u2));
        assert_eq!(parent.latest().value(), &Value::text("before"));
    }

    #[test]
    fn test_upstream_changes_are_not_undone() {
        let parent = Stream::new(Value::text("before"));
        let u = parent.undoable();

        parent.append(replace("before", "after"));
        assert_eq!(u.latest().value(), &Value::text("after"));

        u.undo();
        assert_eq!(u.latest().value(), &Value::text("after"));
    }

    #[test]
    fn test_interleaving_upstream_changes() {
        let parent = Stream::new(Value::text("hello"));
        let u = parent.undoable();

        parent.append(insert(0, "OK, "));
        u.append(insert(5, " world"));
        assert_eq!(u.latest().value(), &Value::text("OK, hello world"));

        u.undo();
        assert_eq!(parent.latest().value(), &Value::text("OK, hello"));

        parent.latest().append(insert(9, "!"));
        assert_eq!(u.latest().value(), &Value::text("OK, hello!"));

        u.redo();
        assert_eq!(u.latest().value(), &Value::text("OK, hello! world"));
        assert_eq!(parent.latest().value(), &Value::text("OK, hello! world"));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let u = Stream::new(Value::text("ab")).undoable();
        let u1 = u.append(insert(2, "c"));
        let u2 = u1.undo();
        let u3 = u2.append(insert(0, "x"));
        assert_eq!(u3.value(), &Value::text("xab"));
        assert!(u3.redo().same_version(&u3));

        let u4 = u3.undo();
        assert_eq!(u4.value(), &Value::text("ab"));
    }
}
