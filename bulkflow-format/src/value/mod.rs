//! Typed value model
//!
//! A [`Value`] is one cell of a record: a closed set of variants matching
//! the families of the wire format. Values are immutable; conversions
//! return new values or fail.
//!
//! Equality never crosses variants (`Integer(1) != Float(1.0)`), arrays
//! compare in order, maps compare as multisets of key/value pairs, and
//! floats compare by bit pattern after folding `-0.0` into `0.0` and every
//! NaN into one. That makes equality reflexive, so `Value` is `Eq` and can
//! key a `HashMap`.

mod extension;
mod integer;
mod json;

use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHashMap;

pub use extension::ExtensionValue;
pub use integer::Integer;

use crate::error::{FlowError, Result};
use crate::types::ValueType;

/// Fixed seeds so per-pair map hashes are stable within a process.
const MAP_HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// One scalar or composite datum
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Nil,
    /// Boolean value
    Boolean(bool),
    /// Integer in `[-2^63, 2^64-1]`
    Integer(Integer),
    /// Double precision float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Opaque bytes
    Binary(Vec<u8>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Key/value pairs in wire order; keys may repeat
    Map(Vec<(Value, Value)>),
    /// Application-defined type
    Extension(ExtensionValue),
}

impl Value {
    /// Variant tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Binary(_) => ValueType::Binary,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Extension(_) => ValueType::Extension,
        }
    }

    fn wrong_variant(&self, expected: ValueType) -> FlowError {
        FlowError::WrongVariant {
            expected,
            actual: self.value_type(),
        }
    }

    /// True for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True for [`Value::Boolean`].
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// True for [`Value::Integer`].
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// True for [`Value::Float`].
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// True for [`Value::String`].
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// True for [`Value::Binary`].
    pub fn is_binary(&self) -> bool {
        matches!(self, Value::Binary(_))
    }

    /// True for [`Value::Array`].
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// True for [`Value::Map`].
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// True for [`Value::Extension`].
    pub fn is_extension(&self) -> bool {
        matches!(self, Value::Extension(_))
    }

    /// Succeeds only for nil.
    pub fn as_nil(&self) -> Result<()> {
        match self {
            Value::Nil => Ok(()),
            other => Err(other.wrong_variant(ValueType::Nil)),
        }
    }

    /// Boolean payload.
    pub fn as_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(other.wrong_variant(ValueType::Boolean)),
        }
    }

    /// Integer payload.
    pub fn as_integer(&self) -> Result<Integer> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(other.wrong_variant(ValueType::Integer)),
        }
    }

    /// Float payload.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(other.wrong_variant(ValueType::Float)),
        }
    }

    /// String payload.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.wrong_variant(ValueType::String)),
        }
    }

    /// Binary payload.
    pub fn as_binary(&self) -> Result<&[u8]> {
        match self {
            Value::Binary(b) => Ok(b),
            other => Err(other.wrong_variant(ValueType::Binary)),
        }
    }

    /// Array elements.
    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(other.wrong_variant(ValueType::Array)),
        }
    }

    /// Map entries in wire order.
    pub fn as_map(&self) -> Result<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(other.wrong_variant(ValueType::Map)),
        }
    }

    /// Extension payload.
    pub fn as_extension(&self) -> Result<&ExtensionValue> {
        match self {
            Value::Extension(ext) => Ok(ext),
            other => Err(other.wrong_variant(ValueType::Extension)),
        }
    }

    /// Look up `key` in a map; the last entry wins when keys repeat.
    pub fn get(&self, key: &Value) -> Result<Option<&Value>> {
        let entries = self.as_map()?;
        Ok(entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v))
    }

    /// Convenience lookup by string key.
    pub fn get_str(&self, key: &str) -> Result<Option<&Value>> {
        let entries = self.as_map()?;
        Ok(entries
            .iter()
            .rev()
            .find(|(k, _)| matches!(k, Value::String(s) if s == key))
            .map(|(_, v)| v))
    }
}

/// Bit pattern used for float equality and hashing.
fn canonical_float_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

fn maps_equal(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a == b {
        return true;
    }
    let mut counts: AHashMap<&(Value, Value), usize> = AHashMap::with_capacity(a.len());
    for pair in a {
        *counts.entry(pair).or_insert(0) += 1;
    }
    b.iter().all(|pair| match counts.get_mut(pair) {
        Some(count) if *count > 0 => {
            *count -= 1;
            true
        }
        _ => false,
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                canonical_float_bits(*a) == canonical_float_bits(*b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => maps_equal(a, b),
            (Value::Extension(a), Value::Extension(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.value_type() as u8);
        match self {
            Value::Nil => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => state.write_u64(canonical_float_bits(*f)),
            Value::String(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Map(entries) => {
                let seeds = ahash::RandomState::with_seeds(
                    MAP_HASH_SEEDS[0],
                    MAP_HASH_SEEDS[1],
                    MAP_HASH_SEEDS[2],
                    MAP_HASH_SEEDS[3],
                );
                let combined = entries
                    .iter()
                    .fold(0u64, |acc, pair| acc.wrapping_add(seeds.hash_one(pair)));
                state.write_usize(entries.len());
                state.write_u64(combined);
            }
            Value::Extension(ext) => ext.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("null"),
            Value::Integer(i) => fmt::Display::fmt(i, f),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Value::Integer(value)
    }
}

macro_rules! impl_value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Integer(Integer::from(value))
            }
        })*
    };
}

impl_value_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(value: Vec<(Value, Value)>) -> Self {
        Value::Map(value)
    }
}

impl From<ExtensionValue> for Value {
    fn from(value: ExtensionValue) -> Self {
        Value::Extension(value)
    }
}
