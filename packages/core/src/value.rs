//! The Value type - an application-level document tree.
//!
//! Leaves are plain JSON scalars or rich scalars (identifiers, timestamps,
//! durations, blobs, vectors, arbitrary-precision numbers). Internal nodes
//! are insertion-ordered maps, arrays and sets.

use std::fmt;
use std::net::IpAddr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use uuid::Uuid;

use crate::types::{Blob, CalendarDuration, CustomValue, ObjectId, Vector};
use crate::{Error, Path, Segment};

/// Insertion-ordered map with string keys.
pub type Map = IndexMap<String, Value>;

/// A document, or any node inside one.
///
/// # Design Notes
///
/// - Uses `IndexMap` so key order survives a round trip through the wire
/// - Every rich scalar is its own variant; nothing is recognized by shape
/// - `Set` is a sequence on the wire; the variant keeps the intent on the
///   application side
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Integer of any size.
    BigInt(BigInt),
    /// Decimal of any size and precision.
    Decimal(BigDecimal),
    String(String),
    Uuid(Uuid),
    ObjectId(ObjectId),
    /// An instant, UTC.
    Timestamp(DateTime<Utc>),
    /// A calendar date with no time zone.
    Date(NaiveDate),
    /// A time of day with no date or time zone.
    Time(NaiveTime),
    Duration(CalendarDuration),
    Inet(IpAddr),
    Blob(Blob),
    Vector(Vector),
    Array(Vec<Value>),
    Set(Vec<Value>),
    Map(Map),
    Custom(CustomValue),
}

/// The dynamic type of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    BigInt,
    Decimal,
    String,
    Uuid,
    ObjectId,
    Timestamp,
    Date,
    Time,
    Duration,
    Inet,
    Blob,
    Vector,
    Array,
    Set,
    Map,
    Custom,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::BigInt => "bigint",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::Uuid => "uuid",
            ValueKind::ObjectId => "objectId",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Duration => "duration",
            ValueKind::Inet => "inet",
            ValueKind::Blob => "blob",
            ValueKind::Vector => "vector",
            ValueKind::Array => "array",
            ValueKind::Set => "set",
            ValueKind::Map => "map",
            ValueKind::Custom => "custom",
        }
    }

    /// Numeric kinds subject to a number representation policy.
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            ValueKind::Integer | ValueKind::Float | ValueKind::BigInt | ValueKind::Decimal
        )
    }

    /// Kinds that need a non-trivial wire encoding.
    pub fn is_rich_scalar(&self) -> bool {
        matches!(
            self,
            ValueKind::Uuid
                | ValueKind::ObjectId
                | ValueKind::Timestamp
                | ValueKind::Date
                | ValueKind::Time
                | ValueKind::Duration
                | ValueKind::Inet
                | ValueKind::Blob
                | ValueKind::Vector
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ValueKind::Array | ValueKind::Set | ValueKind::Map)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Duration(_) => ValueKind::Duration,
            Value::Inet(_) => ValueKind::Inet,
            Value::Blob(_) => ValueKind::Blob,
            Value::Vector(_) => ValueKind::Vector,
            Value::Array(_) => ValueKind::Array,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::Custom(_) => ValueKind::Custom,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Check whether this value is made only of JSON-representable parts:
    /// null, bools, finite numbers, strings, arrays and maps.
    pub fn is_plain(&self) -> bool {
        match self {
            Value::Null
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::BigInt(_)
            | Value::Decimal(_)
            | Value::String(_) => true,
            Value::Float(f) => f.is_finite(),
            Value::Array(items) => items.iter().all(Value::is_plain),
            Value::Map(map) => map.values().all(Value::is_plain),
            _ => false,
        }
    }

    /// Get a reference to a nested value by path.
    ///
    /// Returns `None` if the path doesn't exist or can't be navigated
    /// (e.g., trying to index into a string).
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for segment in path.iter() {
            current = match current {
                Value::Map(map) => map.get(&map_key(segment))?,
                Value::Array(items) | Value::Set(items) => items.get(seq_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Get a mutable reference to a nested value by path.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut current = self;
        for segment in path.iter() {
            current = match current {
                Value::Map(map) => map.get_mut(&map_key(segment))?,
                Value::Array(items) | Value::Set(items) => items.get_mut(seq_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a path, creating intermediate maps as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path traverses through a non-container value
    /// (e.g., trying to set `foo.bar` when `foo` is a string), or addresses
    /// a sequence slot past its end.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), Error> {
        let Some((last, parents)) = path.segments.split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        for segment in parents {
            current = match current {
                Value::Map(map) => map.entry(map_key(segment)).or_insert_with(Value::map),
                Value::Array(items) | Value::Set(items) => {
                    let index = seq_index(segment).ok_or_else(|| bad_index(segment))?;
                    items.get_mut(index).ok_or_else(|| Error::InvalidPath {
                        message: format!("index {} out of bounds", index),
                    })?
                }
                _ => {
                    return Err(Error::InvalidPath {
                        message: format!("cannot navigate through non-container at '{}'", segment),
                    })
                }
            };
        }

        match current {
            Value::Map(map) => {
                map.insert(map_key(last), value);
                Ok(())
            }
            Value::Array(items) | Value::Set(items) => {
                let index = seq_index(last).ok_or_else(|| bad_index(last))?;
                if index < items.len() {
                    items[index] = value;
                } else if index == items.len() {
                    items.push(value);
                } else {
                    return Err(Error::InvalidPath {
                        message: format!("index {} out of bounds", index),
                    });
                }
                Ok(())
            }
            _ => Err(Error::InvalidPath {
                message: format!("cannot set child '{}' on non-container value", last),
            }),
        }
    }

    /// Remove a value at a path, returning it if it existed.
    ///
    /// Map entries are removed with `shift_remove`, keeping sibling order.
    pub fn remove(&mut self, path: &Path) -> Option<Value> {
        let Some(parent_path) = path.parent() else {
            return Some(std::mem::take(self));
        };
        let last = path.last()?;

        match self.get_mut(&parent_path)? {
            Value::Map(map) => map.shift_remove(&map_key(last)),
            Value::Array(items) | Value::Set(items) => {
                let index = seq_index(last)?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }
}

fn map_key(segment: &Segment) -> String {
    match segment {
        Segment::Key(k) => k.clone(),
        Segment::Index(i) => i.to_string(),
    }
}

fn seq_index(segment: &Segment) -> Option<usize> {
    match segment {
        Segment::Index(i) => Some(*i),
        Segment::Key(k) => k.parse().ok(),
    }
}

fn bad_index(segment: &Segment) -> Error {
    Error::InvalidPath {
        message: format!("invalid sequence index: {}", segment),
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInt(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<CalendarDuration> for Value {
    fn from(v: CalendarDuration) -> Self {
        Value::Duration(v)
    }
}

impl From<IpAddr> for Value {
    fn from(v: IpAddr) -> Self {
        Value::Inet(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v)
    }
}

impl From<Vector> for Value {
    fn from(v: Vector) -> Self {
        Value::Vector(v)
    }
}

impl From<CustomValue> for Value {
    fn from(v: CustomValue) -> Self {
        Value::Custom(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
