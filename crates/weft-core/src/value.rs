//! Immutable values that changes are applied to.
//!
//! Every variant applies a [`Change`] by producing a new value; the receiver
//! is never mutated. Changes a value cannot accept (a `Splice` on an atomic,
//! an index past the end of a list) leave the value as it was.

use crate::change::{Change, Move, PathChange, Splice};
use crate::schema::StructValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A JSON-safe scalar wrapped by [`Value::Atomic`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

/// A map key or a path segment.
///
/// List elements are addressed with `Key::Int`, struct fields and string
/// keyed map entries with `Key::Str`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Str(_) => None,
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Text stored as UTF-16 code units so offsets match the wire format.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Text(Vec<u16>);

impl Text {
    pub fn new(s: &str) -> Self {
        Self(s.encode_utf16().collect())
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self(units)
    }

    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::new(s)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf16_lossy(&self.0))
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Text({:?})", String::from_utf16_lossy(&self.0))
    }
}

/// Capabilities a value type outside the built-in vocabulary provides.
pub trait CustomValue: fmt::Debug + Send + Sync {
    /// Wire tag used when encoding.
    fn type_name(&self) -> &str;

    /// Apply any change, returning the new value.
    fn apply(&self, change: &Change) -> Value;

    /// Encode the payload placed under the type tag.
    fn encode(&self) -> serde_json::Value;

    fn equals(&self, other: &dyn CustomValue) -> bool {
        self.type_name() == other.type_name() && self.encode() == other.encode()
    }
}

/// An immutable, typed value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Atomic(Scalar),
    Text(Text),
    List(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    Struct(StructValue),
    Custom(Arc<dyn CustomValue>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Atomic(a), Value::Atomic(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => a.equals(b.as_ref()),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn text(s: &str) -> Self {
        Value::Text(Text::new(s))
    }

    pub fn atomic(s: impl Into<Scalar>) -> Self {
        Value::Atomic(s.into())
    }

    pub fn int(i: i64) -> Self {
        Value::Atomic(Scalar::Int(i))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Build a map, dropping `Null` entries.
    pub fn map(entries: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Length of a text or list value; zero for everything else.
    pub fn len(&self) -> usize {
        match self {
            Value::Text(t) => t.len(),
            Value::List(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sub-sequence `[start, end)` of a text or list value, clamped to bounds.
    pub fn slice(&self, start: i64, end: i64) -> Value {
        let len = self.len() as i64;
        let start = start.clamp(0, len) as usize;
        let end = end.clamp(start as i64, len) as usize;
        match self {
            Value::Text(t) => Value::Text(Text::from_units(t.units()[start..end].to_vec())),
            Value::List(items) => Value::List(items[start..end].to_vec()),
            _ => Value::Null,
        }
    }

    /// The value stored under `key`; `Null` when absent.
    pub fn get(&self, key: &Key) -> Value {
        match (self, key) {
            (Value::List(items), Key::Int(idx)) => usize::try_from(*idx)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
            (Value::Map(entries), _) => entries.get(key).cloned().unwrap_or_default(),
            (Value::Struct(s), Key::Str(name)) => s.field(name).cloned().unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Apply an optional change; `None` is the identity.
    pub fn apply_opt(&self, change: Option<&Change>) -> Value {
        match change {
            Some(c) => self.apply(c),
            None => self.clone(),
        }
    }

    pub fn apply(&self, change: &Change) -> Value {
        if let Value::Custom(custom) = self {
            return custom.apply(change);
        }

        match change {
            Change::Replace(r) => r.after.clone(),
            Change::Changes(all) => all.iter().fold(self.clone(), |v, c| v.apply(c)),
            Change::Path(pc) => self.apply_path(pc),
            Change::Splice(s) => self.apply_splice(s),
            Change::Move(m) => self.apply_move(m),
        }
    }

    fn apply_path(&self, pc: &PathChange) -> Value {
        let Some((head, rest)) = pc.path.split_first() else {
            return self.apply_opt(pc.change.as_deref());
        };
        let inner = PathChange::new(rest.to_vec(), pc.change.as_deref().cloned());

        match self {
            Value::List(items) => {
                let idx = head.as_index().and_then(|i| usize::try_from(i).ok());
                match idx {
                    Some(i) if i < items.len() => {
                        let mut updated = items.clone();
                        updated[i] = items[i].apply_path(&inner);
                        Value::List(updated)
                    }
                    _ => self.ignore("list index out of range"),
                }
            }
            Value::Map(entries) => {
                let current = entries.get(head).cloned().unwrap_or_default();
                let mut updated = entries.clone();
                let next = current.apply_path(&inner);
                if next.is_null() {
                    updated.remove(head);
                } else {
                    updated.insert(head.clone(), next);
                }
                Value::Map(updated)
            }
            Value::Struct(s) => match head {
                Key::Str(name) => match s.def().position(name) {
                    Some(idx) => {
                        let next = s.fields()[idx].apply_path(&inner);
                        match s.with_field(idx, next) {
                            Ok(updated) => Value::Struct(updated),
                            Err(_) => self.ignore("value does not fit the struct field"),
                        }
                    }
                    None => self.ignore("unknown struct field"),
                },
                Key::Int(_) => self.ignore("struct fields are addressed by name"),
            },
            _ => self.ignore("path into a value without children"),
        }
    }

    fn apply_splice(&self, s: &Splice) -> Value {
        let remove = s.before.len();
        match (self, &s.after) {
            (Value::Text(t), Value::Text(after)) => {
                match splice_items(t.units(), s.offset, remove, after.units()) {
                    Some(units) => Value::Text(Text::from_units(units)),
                    None => self.ignore("splice out of range"),
                }
            }
            (Value::Text(t), Value::Null) => match splice_items(t.units(), s.offset, remove, &[]) {
                Some(units) => Value::Text(Text::from_units(units)),
                None => self.ignore("splice out of range"),
            },
            (Value::List(items), Value::List(after)) => {
                match splice_items(items, s.offset, remove, after) {
                    Some(items) => Value::List(items),
                    None => self.ignore("splice out of range"),
                }
            }
            (Value::List(items), Value::Null) => match splice_items(items, s.offset, remove, &[]) {
                Some(items) => Value::List(items),
                None => self.ignore("splice out of range"),
            },
            _ => self.ignore("splice on a non-sequence value"),
        }
    }

    fn apply_move(&self, m: &Move) -> Value {
        match self {
            Value::Text(t) => match move_items(t.units(), m) {
                Some(units) => Value::Text(Text::from_units(units)),
                None => self.ignore("move out of range"),
            },
            Value::List(items) => match move_items(items, m) {
                Some(items) => Value::List(items),
                None => self.ignore("move out of range"),
            },
            _ => self.ignore("move on a non-sequence value"),
        }
    }

    fn ignore(&self, reason: &'static str) -> Value {
        tracing::warn!(reason, "ignoring inapplicable change");
        self.clone()
    }
}

fn splice_items<T: Clone>(items: &[T], offset: i64, remove: usize, insert: &[T]) -> Option<Vec<T>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(remove)?;
    if end > items.len() {
        return None;
    }
    let mut out = Vec::with_capacity(items.len() - remove + insert.len());
    out.extend_from_slice(&items[..start]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&items[end..]);
    Some(out)
}

/// Reassemble `[0,o) [o+c,o+c+d) [o,o+c) [o+c+d,len)` after normalising a
/// negative distance into the equivalent forward move.
fn move_items<T: Clone>(items: &[T], m: &Move) -> Option<Vec<T>> {
    let (mut offset, mut count, mut distance) = (m.offset, m.count, m.distance);
    if distance < 0 {
        (offset, count, distance) = (offset.checked_add(distance)?, distance.checked_neg()?, count);
    }
    let o = usize::try_from(offset).ok()?;
    let c = usize::try_from(count).ok()?;
    let d = usize::try_from(distance).ok()?;
    if o.checked_add(c)?.checked_add(d)? > items.len() {
        return None;
    }
    let mut out = Vec::with_capacity(items.len());
    out.extend_from_slice(&items[..o]);
    out.extend_from_slice(&items[o + c..o + c + d]);
    out.extend_from_slice(&items[o..o + c]);
    out.extend_from_slice(&items[o + c + d..]);
    Some(out)
}
