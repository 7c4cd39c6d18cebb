//! Tagged JSON encoding for values and changes.
//!
//! Every value and change is a single-key object whose key is the type tag,
//! e.g. `{"changes.Replace": [before, after]}`. Decoding goes through a
//! [`Registry`] that knows the struct schemas and custom value decoders in
//! use; unknown tags are rejected.

use crate::change::{Change, Changes, Move, PathChange, Replace, Splice, MAX_POSITION};
use crate::error::{CoreError, Result};
use crate::schema::{FieldKind, StructDef, StructValue};
use crate::value::{Key, Scalar, Text, Value};
use serde_json::{json, Map as JsonMap, Value as Json};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub const ATOMIC_TAG: &str = "changes.Atomic";
pub const NULL_TAG: &str = "changes.empty";
pub const TEXT_TAG: &str = "changes/types.S16";
pub const LIST_TAG: &str = "changes/types.A";
pub const MAP_TAG: &str = "changes/types.M";
pub const REPLACE_TAG: &str = "changes.Replace";
pub const SPLICE_TAG: &str = "changes.Splice";
pub const MOVE_TAG: &str = "changes.Move";
pub const PATH_TAG: &str = "changes.PathChange";
pub const CHANGES_TAG: &str = "changes.ChangeSet";

fn tagged(tag: &str, body: Json) -> Json {
    let mut obj = JsonMap::with_capacity(1);
    obj.insert(tag.to_string(), body);
    Json::Object(obj)
}

pub fn encode_scalar(s: &Scalar) -> Json {
    match s {
        Scalar::Nil => Json::Null,
        Scalar::Bool(b) => json!({ "bool": b }),
        Scalar::Int(i) => json!({ "int": i }),
        Scalar::Float(f) => json!({ "float64": f.to_string() }),
        Scalar::Str(s) => json!({ "string": s }),
    }
}

pub fn encode_key(k: &Key) -> Json {
    match k {
        Key::Int(i) => json!({ "int": i }),
        Key::Str(s) => json!({ "string": s }),
    }
}

pub fn encode_value(v: &Value) -> Json {
    match v {
        Value::Null => tagged(NULL_TAG, json!([])),
        Value::Atomic(s) => tagged(ATOMIC_TAG, json!([encode_scalar(s)])),
        Value::Text(t) => tagged(TEXT_TAG, Json::String(t.to_string())),
        Value::List(items) => tagged(LIST_TAG, Json::Array(items.iter().map(encode_value).collect())),
        Value::Map(entries) => tagged(
            MAP_TAG,
            Json::Array(
                entries
                    .iter()
                    .map(|(k, v)| json!([encode_key(k), encode_value(v)]))
                    .collect(),
            ),
        ),
        Value::Struct(s) => tagged(s.def().type_name(), encode_struct_fields(s)),
        Value::Custom(c) => tagged(c.type_name(), c.encode()),
    }
}

fn encode_struct_fields(s: &StructValue) -> Json {
    let fields = s
        .def()
        .fields()
        .iter()
        .zip(s.fields())
        .map(|(field, value)| match (field.kind, value) {
            (FieldKind::Value, v) => encode_value(v),
            (_, Value::Null) | (_, Value::Atomic(Scalar::Nil)) => Json::Null,
            (FieldKind::Float, Value::Atomic(Scalar::Float(f))) => Json::String(f.to_string()),
            (_, Value::Atomic(Scalar::Bool(b))) => json!(b),
            (_, Value::Atomic(Scalar::Int(i))) => json!(i),
            (_, Value::Atomic(Scalar::Float(f))) => json!(f),
            (_, Value::Atomic(Scalar::Str(s))) => json!(s),
            (_, Value::Text(t)) => Json::String(t.to_string()),
            (_, other) => encode_value(other),
        })
        .collect();
    Json::Array(fields)
}

pub fn encode_change(c: &Change) -> Json {
    match c {
        Change::Replace(r) => tagged(
            REPLACE_TAG,
            json!([encode_value(&r.before), encode_value(&r.after)]),
        ),
        Change::Splice(s) => tagged(
            SPLICE_TAG,
            json!([s.offset, encode_value(&s.before), encode_value(&s.after)]),
        ),
        Change::Move(m) => tagged(MOVE_TAG, json!([m.offset, m.count, m.distance])),
        Change::Path(p) => {
            let path = if p.path.is_empty() {
                Json::Null
            } else {
                Json::Array(p.path.iter().map(encode_key).collect())
            };
            tagged(PATH_TAG, json!([path, encode_change_opt(p.change.as_deref())]))
        }
        Change::Changes(all) => tagged(CHANGES_TAG, Json::Array(all.iter().map(encode_change).collect())),
    }
}

pub fn encode_change_opt(c: Option<&Change>) -> Json {
    c.map(encode_change).unwrap_or(Json::Null)
}

/// Decoder for a custom value tag.
pub type CustomDecoder = Arc<dyn Fn(&Registry, &Json) -> Result<Value> + Send + Sync>;

/// Decode context: struct schemas and custom value decoders by tag.
///
/// Built once during setup and passed to every decode call.
#[derive(Clone, Default)]
pub struct Registry {
    structs: HashMap<String, Arc<StructDef>>,
    custom: HashMap<String, CustomDecoder>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("structs", &self.structs.keys().collect::<Vec<_>>())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unwrap_tag(json: &Json) -> Result<(&str, &Json)> {
    match json {
        Json::Object(obj) if obj.len() == 1 => {
            let (tag, body) = obj.iter().next().ok_or_else(|| CoreError::Malformed("empty object".into()))?;
            Ok((tag.as_str(), body))
        }
        other => Err(CoreError::Malformed(format!("expected a tagged object, got {}", other))),
    }
}

fn array<'a>(tag: &str, body: &'a Json, expected: usize) -> Result<&'a [Json]> {
    let items = body
        .as_array()
        .ok_or_else(|| CoreError::Malformed(format!("{} body must be an array", tag)))?;
    if items.len() != expected {
        return Err(CoreError::Arity {
            tag: tag.to_string(),
            expected,
            found: items.len(),
        });
    }
    Ok(items)
}

fn int(tag: &str, json: &Json) -> Result<i64> {
    json.as_i64()
        .ok_or_else(|| CoreError::Malformed(format!("{} expects an integer, got {}", tag, json)))
}

/// An offset, count or distance, limited to `min..=MAX_POSITION`.
fn position(tag: &str, json: &Json, min: i64) -> Result<i64> {
    let n = int(tag, json)?;
    if n < min || n > MAX_POSITION {
        return Err(CoreError::Malformed(format!(
            "{} position {} outside {}..={}",
            tag, n, min, MAX_POSITION
        )));
    }
    Ok(n)
}

fn list<'a>(tag: &str, body: &'a Json) -> Result<&'a [Json]> {
    body.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| CoreError::Malformed(format!("{} body must be an array, got {}", tag, body)))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_struct(mut self, def: Arc<StructDef>) -> Self {
        self.structs.insert(def.type_name().to_string(), def);
        self
    }

    pub fn with_custom(mut self, tag: impl Into<String>, decoder: CustomDecoder) -> Self {
        self.custom.insert(tag.into(), decoder);
        self
    }

    pub fn decode_scalar(&self, json: &Json) -> Result<Scalar> {
        if json.is_null() {
            return Ok(Scalar::Nil);
        }
        let (tag, body) = unwrap_tag(json)?;
        match tag {
            "bool" => body
                .as_bool()
                .map(Scalar::Bool)
                .ok_or_else(|| CoreError::Malformed(format!("bad bool: {}", body))),
            "int" => int(tag, body).map(Scalar::Int),
            "float64" => body
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .map(Scalar::Float)
                .ok_or_else(|| CoreError::Malformed(format!("bad float64: {}", body))),
            "string" => body
                .as_str()
                .map(|s| Scalar::Str(s.to_string()))
                .ok_or_else(|| CoreError::Malformed(format!("bad string: {}", body))),
            other => Err(CoreError::UnknownTag(other.to_string())),
        }
    }

    pub fn decode_key(&self, json: &Json) -> Result<Key> {
        match self.decode_scalar(json)? {
            Scalar::Int(i) => Ok(Key::Int(i)),
            Scalar::Str(s) => Ok(Key::Str(s)),
            other => Err(CoreError::Malformed(format!("unsupported key: {:?}", other))),
        }
    }

    pub fn decode_value(&self, json: &Json) -> Result<Value> {
        let (tag, body) = unwrap_tag(json)?;
        match tag {
            NULL_TAG => Ok(Value::Null),
            ATOMIC_TAG => {
                let items = array(tag, body, 1)?;
                Ok(Value::Atomic(self.decode_scalar(&items[0])?))
            }
            TEXT_TAG => body
                .as_str()
                .map(Value::text)
                .ok_or_else(|| CoreError::Malformed(format!("{} expects a string", tag))),
            LIST_TAG => {
                let items = list(tag, body)?;
                let values = items
                    .iter()
                    .map(|item| self.decode_value(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            MAP_TAG => {
                let pairs = list(tag, body)?;
                let mut entries = BTreeMap::new();
                for pair in pairs {
                    let kv = array(tag, pair, 2)?;
                    let value = self.decode_value(&kv[1])?;
                    if !value.is_null() {
                        entries.insert(self.decode_key(&kv[0])?, value);
                    }
                }
                Ok(Value::Map(entries))
            }
            other => {
                if let Some(def) = self.structs.get(other) {
                    return self.decode_struct(def, body);
                }
                if let Some(decoder) = self.custom.get(other) {
                    return decoder(self, body);
                }
                Err(CoreError::UnknownTag(other.to_string()))
            }
        }
    }

    fn decode_struct(&self, def: &Arc<StructDef>, body: &Json) -> Result<Value> {
        let items = array(def.type_name(), body, def.fields().len())?;
        let mut fields = Vec::with_capacity(items.len());
        for (field, json) in def.fields().iter().zip(items) {
            let value = match (field.kind, json) {
                (FieldKind::Value, j) => self.decode_value(j)?,
                (_, Json::Null) => Value::Null,
                (FieldKind::Bool, Json::Bool(b)) => Value::Atomic(Scalar::Bool(*b)),
                (FieldKind::Int, j) if j.is_i64() => Value::Atomic(Scalar::Int(int(&field.name, j)?)),
                (FieldKind::Float, Json::String(s)) => s
                    .parse::<f64>()
                    .map(|f| Value::Atomic(Scalar::Float(f)))
                    .map_err(|_| CoreError::Malformed(format!("bad float field {}", field.name)))?,
                (FieldKind::String, Json::String(s)) => Value::Atomic(Scalar::Str(s.clone())),
                (FieldKind::Text, Json::String(s)) => Value::Text(Text::new(s)),
                (kind, j) => {
                    return Err(CoreError::Malformed(format!(
                        "field {} of kind {:?} cannot hold {}",
                        field.name, kind, j
                    )))
                }
            };
            fields.push(value);
        }
        def.instantiate(fields)
    }

    /// Decode a change; JSON `null` is the null change.
    pub fn decode_change(&self, json: &Json) -> Result<Option<Change>> {
        if json.is_null() {
            return Ok(None);
        }
        let (tag, body) = unwrap_tag(json)?;
        let change = match tag {
            REPLACE_TAG => {
                let items = array(tag, body, 2)?;
                Change::Replace(Replace::new(
                    self.decode_value(&items[0])?,
                    self.decode_value(&items[1])?,
                ))
            }
            SPLICE_TAG => {
                let items = array(tag, body, 3)?;
                Change::Splice(Splice::new(
                    position(tag, &items[0], 0)?,
                    self.decode_value(&items[1])?,
                    self.decode_value(&items[2])?,
                ))
            }
            MOVE_TAG => {
                let items = array(tag, body, 3)?;
                Change::Move(Move::new(
                    position(tag, &items[0], 0)?,
                    position(tag, &items[1], 0)?,
                    position(tag, &items[2], -MAX_POSITION)?,
                ))
            }
            PATH_TAG => {
                let items = array(tag, body, 2)?;
                let path = match &items[0] {
                    Json::Null => Vec::new(),
                    Json::Array(keys) => keys
                        .iter()
                        .map(|k| self.decode_key(k))
                        .collect::<Result<Vec<_>>>()?,
                    other => {
                        return Err(CoreError::Malformed(format!("bad path: {}", other)));
                    }
                };
                Change::Path(PathChange::new(path, self.decode_change(&items[1])?))
            }
            CHANGES_TAG => {
                let items = list(tag, body)?;
                let mut all = Vec::with_capacity(items.len());
                for item in items {
                    all.extend(self.decode_change(item)?);
                }
                if all.is_empty() {
                    return Ok(None);
                }
                Change::Changes(Changes::new(all))
            }
            other => return Err(CoreError::UnknownTag(other.to_string())),
        };
        Ok(Some(change))
    }
}
