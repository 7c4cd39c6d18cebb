//! Operations: changes with an identity and a place in the log.

use crate::error::{Result, SyncError};
use serde_json::{json, Value as Json};
use std::fmt;
use ulid::Ulid;
use weft_core::{change, encode_change_opt, Change, CoreError, Registry};

pub const OPERATION_TAG: &str = "ops.Operation";

/// A change sent to or received from the authoritative log.
///
/// `version` is the log position assigned by the server (-1 until then).
/// `basis` is the last log version the author had seen when making the
/// change (-1 when nothing had been seen).
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: String,
    pub parent_id: Option<String>,
    pub version: i64,
    pub basis: i64,
    pub change: Option<Change>,
}

impl Operation {
    pub fn new(
        id: impl Into<String>,
        parent_id: Option<String>,
        version: i64,
        basis: i64,
        change: Option<Change>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            version,
            basis,
            change,
        }
    }

    /// Same identity, different change.
    pub fn with_change(&self, change: Option<Change>) -> Operation {
        Operation {
            change,
            ..self.clone()
        }
    }

    /// Merge two operations made against the same state.
    ///
    /// Returns `(other', self')`; each keeps its own id, parent, version
    /// and basis and carries its change transformed past the other.
    pub fn merge(&self, other: &Operation) -> (Operation, Operation) {
        let (other_change, self_change) = change::merge(self.change.as_ref(), other.change.as_ref());
        (other.with_change(other_change), self.with_change(self_change))
    }

    pub fn encode(&self) -> Json {
        let parent = match &self.parent_id {
            Some(id) => json!({ "string": id }),
            None => Json::Null,
        };
        json!({
            OPERATION_TAG: [
                { "string": self.id },
                parent,
                self.version,
                self.basis,
                encode_change_opt(self.change.as_ref()),
            ]
        })
    }

    pub fn decode(registry: &Registry, json: &Json) -> Result<Operation> {
        let body = json
            .get(OPERATION_TAG)
            .and_then(Json::as_array)
            .ok_or_else(|| CoreError::Malformed(format!("expected {}, got {}", OPERATION_TAG, json)))?;
        if body.len() != 5 {
            return Err(CoreError::Arity {
                tag: OPERATION_TAG.to_string(),
                expected: 5,
                found: body.len(),
            }
            .into());
        }

        let id = decode_id(&body[0])?
            .ok_or_else(|| CoreError::Malformed("operation without id".into()))?;
        let parent_id = decode_id(&body[1])?;
        let version = decode_int(&body[2])?;
        let basis = decode_int(&body[3])?;
        let change = registry.decode_change(&body[4])?;
        Ok(Operation::new(id, parent_id, version, basis, change))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} (basis {})", self.id, self.version, self.basis)
    }
}

fn decode_id(json: &Json) -> Result<Option<String>> {
    match json {
        Json::Null => Ok(None),
        Json::String(s) => Ok(Some(s.clone())),
        other => match other.get("string").and_then(Json::as_str) {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(SyncError::Codec(CoreError::Malformed(format!("bad operation id: {}", other)))),
        },
    }
}

fn decode_int(json: &Json) -> Result<i64> {
    json.as_i64()
        .ok_or_else(|| CoreError::Malformed(format!("expected an integer, got {}", json)).into())
}

/// Encode a list of operations as a JSON array.
pub fn encode_ops(ops: &[Operation]) -> Json {
    Json::Array(ops.iter().map(Operation::encode).collect())
}

/// Decode a JSON array of operations; `null` is an empty list.
pub fn decode_ops(registry: &Registry, json: &Json) -> Result<Vec<Operation>> {
    match json {
        Json::Null => Ok(Vec::new()),
        Json::Array(items) => items.iter().map(|op| Operation::decode(registry, op)).collect(),
        other => Err(CoreError::Malformed(format!("expected a list of operations, got {}", other)).into()),
    }
}

/// Source of fresh operation ids.
pub trait IdSource: Send + Sync + 'static {
    fn next_id(&self) -> String;
}

/// ULID ids: unique and roughly time ordered.
#[derive(Clone, Copy, Debug, Default)]
pub struct UlidIds;

impl IdSource for UlidIds {
    fn next_id(&self) -> String {
        Ulid::new().to_string()
    }
}
