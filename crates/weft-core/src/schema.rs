//! Struct schemas.
//!
//! A [`StructDef`] names a struct type on the wire and lists its fields in
//! serialization order. Field names used by `PathChange` are the wire names.

use crate::error::{CoreError, Result};
use crate::value::{Scalar, Value};
use std::sync::Arc;

/// How a struct field is stored and encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    String,
    Text,
    /// Any tagged value.
    Value,
}

impl FieldKind {
    /// Whether a field of this kind can hold `value`. Every kind but
    /// `Value` holds its own scalar or null.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Value, _) | (_, Value::Null) => true,
            (FieldKind::Bool, Value::Atomic(Scalar::Bool(_))) => true,
            (FieldKind::Int, Value::Atomic(Scalar::Int(_))) => true,
            (FieldKind::Float, Value::Atomic(Scalar::Float(_))) => true,
            (FieldKind::String, Value::Atomic(Scalar::Str(_))) => true,
            (FieldKind::Text, Value::Text(_)) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub wire_name: String,
    pub kind: FieldKind,
}

/// Schema for a struct type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDef {
    type_name: String,
    fields: Vec<Field>,
}

impl StructDef {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        wire_name: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            wire_name: wire_name.into(),
            kind,
        });
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Index of the field with the given wire name.
    pub fn position(&self, wire_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.wire_name == wire_name)
    }

    /// Build a struct value; `fields` must follow schema order.
    pub fn instantiate(self: &Arc<Self>, fields: Vec<Value>) -> Result<Value> {
        Ok(Value::Struct(StructValue::new(Arc::clone(self), fields)?))
    }
}

/// A struct value bound to its schema.
#[derive(Clone, Debug)]
pub struct StructValue {
    def: Arc<StructDef>,
    fields: Vec<Value>,
}

impl StructValue {
    pub fn new(def: Arc<StructDef>, fields: Vec<Value>) -> Result<Self> {
        if fields.len() != def.fields.len() {
            return Err(CoreError::Arity {
                tag: def.type_name.clone(),
                expected: def.fields.len(),
                found: fields.len(),
            });
        }
        for (field, value) in def.fields.iter().zip(&fields) {
            check_kind(field, value)?;
        }
        Ok(Self { def, fields })
    }

    pub fn def(&self) -> &Arc<StructDef> {
        &self.def
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Field value by wire name.
    pub fn field(&self, wire_name: &str) -> Option<&Value> {
        self.def.position(wire_name).map(|idx| &self.fields[idx])
    }

    /// Copy with field `idx` replaced; fails when the field's kind cannot
    /// hold `value`.
    pub fn with_field(&self, idx: usize, value: Value) -> Result<Self> {
        let field = self.def.fields.get(idx).ok_or_else(|| {
            CoreError::Malformed(format!("{} has no field {}", self.def.type_name, idx))
        })?;
        check_kind(field, &value)?;
        let mut fields = self.fields.clone();
        fields[idx] = value;
        Ok(Self {
            def: Arc::clone(&self.def),
            fields,
        })
    }
}

fn check_kind(field: &Field, value: &Value) -> Result<()> {
    if field.kind.accepts(value) {
        Ok(())
    } else {
        Err(CoreError::Malformed(format!(
            "field {} of kind {:?} cannot hold {:?}",
            field.wire_name, field.kind, value
        )))
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.def.type_name == other.def.type_name && self.fields == other.fields
    }
}
