//! Snapshot serialization of Values
//!
//! `Value` is a web of shared, mutable boxes and cannot derive serde traits
//! directly. `TypedValue` mirrors it with owned data, derives
//! `Serialize`/`Deserialize`, and is encoded with bincode.
//!
//! # Use Cases
//!
//! - Persisting host-side state that was read from the runtime
//! - Handing a value to another process or thread (`TypedValue` is `Send`)
//! - Reproducible fixtures for tests
//!
//! Table entries are kept in `BTreeMap`s so the same logical value always
//! encodes to identical bytes. Aliasing is not preserved: a table reachable
//! twice is written twice, and a cyclic table fails with
//! [`SerializeError::Cycle`].

use crate::table::Table;
use crate::value::{Value, ValueKind};
use sel_core::DEFAULT_MAX_TABLE_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error during serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializeError {
    /// Bincode encoding/decoding error
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Tables nested past the limit
    #[error("table nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    /// A table contains itself
    #[error("table refers back to itself at depth {depth}")]
    Cycle { depth: usize },
}

/// Serializable representation of a [`Value`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TypedValue {
    Nil,
    Boolean(bool),
    Character(char),
    Integer(i32),
    WideInteger(i64),
    Double(f64),
    String(String),
    Table {
        ints: BTreeMap<i64, TypedValue>,
        strings: BTreeMap<String, TypedValue>,
    },
}

impl TypedValue {
    /// Convert from a runtime Value, following at most
    /// [`DEFAULT_MAX_TABLE_DEPTH`] levels of tables
    pub fn from_value(value: &Value) -> Result<Self, SerializeError> {
        Self::from_value_with_limit(value, DEFAULT_MAX_TABLE_DEPTH)
    }

    /// Convert from a runtime Value with an explicit table nesting limit
    pub fn from_value_with_limit(value: &Value, limit: usize) -> Result<Self, SerializeError> {
        convert(value, &mut Vec::new(), limit)
    }

    /// Rebuild a Value. Every table becomes a fresh, unshared box.
    pub fn to_value(&self) -> Value {
        match self {
            TypedValue::Nil => Value::nil(),
            TypedValue::Boolean(b) => Value::from(*b),
            TypedValue::Character(c) => Value::from(*c),
            TypedValue::Integer(i) => Value::from(*i),
            TypedValue::WideInteger(i) => Value::from(*i),
            TypedValue::Double(d) => Value::from(*d),
            TypedValue::String(s) => Value::from(s.as_str()),
            TypedValue::Table { ints, strings } => {
                let mut table = Table::new();
                for (k, v) in ints {
                    table.set(*k, v.to_value());
                }
                for (k, v) in strings {
                    table.set(k, v.to_value());
                }
                Value::from(table)
            }
        }
    }

    /// Serialize to binary format (bincode)
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        bincode::serialize(self).map_err(SerializeError::from)
    }

    /// Deserialize from binary format (bincode)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializeError> {
        bincode::deserialize(bytes).map_err(SerializeError::from)
    }
}

fn convert(
    value: &Value,
    path: &mut Vec<*const Table>,
    limit: usize,
) -> Result<TypedValue, SerializeError> {
    Ok(match value.kind() {
        ValueKind::Nil => TypedValue::Nil,
        ValueKind::Boolean => TypedValue::Boolean(value.bool_value()),
        ValueKind::Character => TypedValue::Character(value.char_value()),
        ValueKind::Integer => TypedValue::Integer(value.int_value()),
        ValueKind::WideInteger => TypedValue::WideInteger(value.wide_int_value()),
        ValueKind::Double => TypedValue::Double(value.double_value()),
        ValueKind::String => TypedValue::String(value.string_value().to_string()),
        ValueKind::Table => {
            let Some(table) = value.table_ref() else {
                return Ok(TypedValue::Nil);
            };
            let depth = path.len();
            if depth >= limit {
                return Err(SerializeError::NestingTooDeep { limit });
            }
            let id: *const Table = &*table;
            if path.contains(&id) {
                return Err(SerializeError::Cycle { depth });
            }
            path.push(id);
            let mut ints = BTreeMap::new();
            for (k, v) in table.int_map() {
                ints.insert(*k, convert(v, path, limit)?);
            }
            let mut strings = BTreeMap::new();
            for (k, v) in table.str_map() {
                strings.insert(k.clone(), convert(v, path, limit)?);
            }
            path.pop();
            TypedValue::Table { ints, strings }
        }
    })
}

/// Extension trait for Value to add serialization methods
pub trait ValueSerialize: Sized {
    /// Convert to serializable TypedValue
    fn to_typed(&self) -> Result<TypedValue, SerializeError>;

    /// Serialize directly to bytes
    fn to_bytes(&self) -> Result<Vec<u8>, SerializeError>;

    /// Deserialize directly from bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializeError>;
}

impl ValueSerialize for Value {
    fn to_typed(&self) -> Result<TypedValue, SerializeError> {
        TypedValue::from_value(self)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        TypedValue::from_value(self)?.to_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializeError> {
        Ok(TypedValue::from_bytes(bytes)?.to_value())
    }
}
