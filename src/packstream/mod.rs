//! PackStream: the self-describing binary serialization format Bolt/1 uses
//! for every message field.

pub mod marker;
pub mod packer;
pub mod traits;
pub mod unpacker;

pub use marker::PackType;
pub use packer::Packer;
pub use traits::{PackInput, PackOutput};
pub use unpacker::Unpacker;

/// An insertion-ordered string-keyed map, since PackStream maps are packed
/// in insertion order and callers (e.g. `INIT`'s auth token) rely on it.
/// A `Vec` of pairs is enough here: these maps carry request/response
/// metadata, never bulk data, so linear lookup is not a hot path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap(Vec<(String, Value)>);

impl OrderedMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a key, overwriting the prior value if present but keeping its
    /// original position (matches ordinary map "insert" semantics for
    /// in-place updates; appended if new).
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for OrderedMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A tagged PackStream value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Map(OrderedMap),
    Struct { signature: u8, fields: Vec<Value> },
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
