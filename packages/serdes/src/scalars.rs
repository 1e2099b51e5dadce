//! Default wire encodings for rich scalar values.
//!
//! Each rich scalar travels as a single-key tagged object whose key names the
//! type (`{"$uuid": "..."}`). The payload is always a JSON string, number or
//! array of numbers.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use docwire_core::{
    Blob, CalendarDuration, Map, ObjectId, TypeError, Uuid, Value, ValueKind, Vector,
};
use num_traits::ToPrimitive;
use serde::Deserialize;

/// Errors converting a rich scalar to or from its wire payload.
#[derive(Debug, thiserror::Error)]
pub enum ScalarError {
    #[error("'{tag}' expects {expected}, found {found}")]
    Payload {
        tag: &'static str,
        expected: &'static str,
        found: ValueKind,
    },

    #[error("'{tag}': {message}")]
    Invalid { tag: &'static str, message: String },

    #[error("no wire encoding for {0} values")]
    WrongKind(ValueKind),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A rich scalar type with a tagged wire form.
///
/// `from_wire(to_wire(v)) == v` for every value of the type.
pub trait ScalarType: Send + Sync {
    fn kind(&self) -> ValueKind;

    /// The single key of the tagged wire object.
    fn tag(&self) -> &'static str;

    /// The wire payload for `value`.
    fn to_wire(&self, value: &Value) -> Result<Value, ScalarError>;

    /// Decode a wire payload.
    fn from_wire(&self, payload: &Value) -> Result<Value, ScalarError>;
}

/// How vectors are written to the wire. Both forms are accepted on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorEncoding {
    /// A JSON array of numbers.
    #[default]
    Array,
    /// Base64 of the big-endian `f32` components.
    Binary,
}

fn payload_str<'v>(
    tag: &'static str,
    expected: &'static str,
    payload: &'v Value,
) -> Result<&'v str, ScalarError> {
    payload.as_str().ok_or(ScalarError::Payload {
        tag,
        expected,
        found: payload.kind(),
    })
}

fn invalid(tag: &'static str, message: impl ToString) -> ScalarError {
    ScalarError::Invalid {
        tag,
        message: message.to_string(),
    }
}

macro_rules! text_scalar {
    ($name:ident, $kind:ident, $tag:literal, $expected:literal,
     |$v:ident| $to:expr, |$s:ident| $from:expr) => {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name;

        impl ScalarType for $name {
            fn kind(&self) -> ValueKind {
                ValueKind::$kind
            }

            fn tag(&self) -> &'static str {
                $tag
            }

            fn to_wire(&self, value: &Value) -> Result<Value, ScalarError> {
                match value {
                    Value::$kind($v) => Ok(Value::String($to)),
                    other => Err(ScalarError::WrongKind(other.kind())),
                }
            }

            fn from_wire(&self, payload: &Value) -> Result<Value, ScalarError> {
                let $s = payload_str($tag, $expected, payload)?;
                Ok(Value::$kind($from))
            }
        }
    };
}

text_scalar!(UuidType, Uuid, "$uuid", "a UUID string",
    |u| u.hyphenated().to_string(),
    |s| Uuid::parse_str(s).map_err(|e| invalid("$uuid", e))?);

text_scalar!(ObjectIdType, ObjectId, "$objectId", "a hex string",
    |id| id.to_string(),
    |s| ObjectId::parse(s)?);

text_scalar!(DateType, Date, "$localDate", "a YYYY-MM-DD string",
    |d| d.format("%Y-%m-%d").to_string(),
    |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| invalid("$localDate", e))?);

text_scalar!(TimeType, Time, "$localTime", "an HH:MM:SS string",
    |t| t.format("%H:%M:%S%.f").to_string(),
    |s| NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|e| invalid("$localTime", e))?);

text_scalar!(DurationType, Duration, "$duration", "a duration string",
    |d| d.to_string(),
    |s| CalendarDuration::parse(s)?);

text_scalar!(InetType, Inet, "$inet", "an IP address string",
    |ip| ip.to_string(),
    |s| IpAddr::from_str(s).map_err(|e| invalid("$inet", e))?);

text_scalar!(BlobType, Blob, "$binary", "a base64 string",
    |b| b.to_base64(),
    |s| Blob::from_base64(s)?);

/// Instants: epoch milliseconds when that is exact, RFC 3339 otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimestampType;

impl ScalarType for TimestampType {
    fn kind(&self) -> ValueKind {
        ValueKind::Timestamp
    }

    fn tag(&self) -> &'static str {
        "$date"
    }

    fn to_wire(&self, value: &Value) -> Result<Value, ScalarError> {
        let Value::Timestamp(ts) = value else {
            return Err(ScalarError::WrongKind(value.kind()));
        };
        if ts.timestamp_subsec_nanos() % 1_000_000 == 0 {
            Ok(Value::Integer(ts.timestamp_millis()))
        } else {
            Ok(Value::String(ts.to_rfc3339_opts(SecondsFormat::Nanos, true)))
        }
    }

    fn from_wire(&self, payload: &Value) -> Result<Value, ScalarError> {
        let ts = match payload {
            Value::Integer(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .ok_or_else(|| invalid("$date", format!("{} is out of range", millis)))?,
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map_err(|e| invalid("$date", e))?
                .with_timezone(&Utc),
            other => {
                return Err(ScalarError::Payload {
                    tag: "$date",
                    expected: "epoch milliseconds or an RFC 3339 string",
                    found: other.kind(),
                })
            }
        };
        Ok(Value::Timestamp(ts))
    }
}

/// Float vectors, written in the configured [`VectorEncoding`].
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorType {
    pub encoding: VectorEncoding,
}

impl ScalarType for VectorType {
    fn kind(&self) -> ValueKind {
        ValueKind::Vector
    }

    fn tag(&self) -> &'static str {
        "$vector"
    }

    fn to_wire(&self, value: &Value) -> Result<Value, ScalarError> {
        let Value::Vector(vector) = value else {
            return Err(ScalarError::WrongKind(value.kind()));
        };
        match self.encoding {
            VectorEncoding::Binary => Ok(Value::String(vector.to_base64())),
            VectorEncoding::Array => {
                if let Some(bad) = vector.as_slice().iter().find(|c| !c.is_finite()) {
                    return Err(invalid("$vector", format!("component {} has no JSON form", bad)));
                }
                Ok(Value::Array(
                    vector
                        .as_slice()
                        .iter()
                        .map(|&c| Value::Float(f64::from(c)))
                        .collect(),
                ))
            }
        }
    }

    fn from_wire(&self, payload: &Value) -> Result<Value, ScalarError> {
        let vector = match payload {
            Value::String(s) => Vector::from_base64(s)?,
            Value::Array(items) => items
                .iter()
                .map(|item| component(item).map(|c| c as f32))
                .collect::<Result<Vec<_>, _>>()
                .map(Vector::new)?,
            other => {
                return Err(ScalarError::Payload {
                    tag: "$vector",
                    expected: "an array of numbers or a base64 string",
                    found: other.kind(),
                })
            }
        };
        Ok(Value::Vector(vector))
    }
}

fn component(item: &Value) -> Result<f64, ScalarError> {
    let n = match item {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::BigInt(b) => b.to_f64(),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    };
    n.ok_or(ScalarError::Payload {
        tag: "$vector",
        expected: "numeric components",
        found: item.kind(),
    })
}

/// The rich scalar types known to a [`crate::SerDes`] handle.
#[derive(Clone)]
pub struct ScalarRegistry {
    types: Vec<Arc<dyn ScalarType>>,
}

impl ScalarRegistry {
    /// All built-in types, vectors written with `vectors`.
    pub fn new(vectors: VectorEncoding) -> Self {
        ScalarRegistry {
            types: vec![
                Arc::new(UuidType),
                Arc::new(ObjectIdType),
                Arc::new(TimestampType),
                Arc::new(DateType),
                Arc::new(TimeType),
                Arc::new(DurationType),
                Arc::new(InetType),
                Arc::new(BlobType),
                Arc::new(VectorType { encoding: vectors }),
            ],
        }
    }

    /// Install a type, replacing any type of the same kind or tag.
    pub fn register(&mut self, scalar: Arc<dyn ScalarType>) {
        self.types
            .retain(|t| t.kind() != scalar.kind() && t.tag() != scalar.tag());
        self.types.push(scalar);
    }

    pub fn by_kind(&self, kind: ValueKind) -> Option<&dyn ScalarType> {
        self.types
            .iter()
            .find(|t| t.kind() == kind)
            .map(|t| t.as_ref())
    }

    pub fn by_tag(&self, tag: &str) -> Option<&dyn ScalarType> {
        self.types
            .iter()
            .find(|t| t.tag() == tag)
            .map(|t| t.as_ref())
    }

    /// Encode a rich scalar as its tagged wire object.
    ///
    /// Returns `None` when the value's kind has no registered type.
    pub fn to_wire(&self, value: &Value) -> Option<Result<Value, ScalarError>> {
        let scalar = self.by_kind(value.kind())?;
        Some(scalar.to_wire(value).map(|payload| {
            let mut tagged = Map::with_capacity(1);
            tagged.insert(scalar.tag().to_string(), payload);
            Value::Map(tagged)
        }))
    }

    /// Decode a tagged wire object.
    ///
    /// Returns `None` unless `value` is a map with exactly one key and that
    /// key is a known tag.
    pub fn from_wire(&self, value: &Value) -> Option<Result<Value, ScalarError>> {
        let map = value.as_map().filter(|m| m.len() == 1)?;
        let (tag, payload) = map.first()?;
        let scalar = self.by_tag(tag)?;
        Some(scalar.from_wire(payload))
    }
}

impl Default for ScalarRegistry {
    fn default() -> Self {
        ScalarRegistry::new(VectorEncoding::default())
    }
}

impl std::fmt::Debug for ScalarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.types.iter().map(|t| t.tag()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn round_trip(registry: &ScalarRegistry, value: Value) -> Value {
        let wire = registry.to_wire(&value).unwrap().unwrap();
        assert!(wire.is_plain(), "wire form must be plain: {:?}", wire);
        assert_eq!(wire.as_map().unwrap().len(), 1);
        let back = registry.from_wire(&wire).unwrap().unwrap();
        assert_eq!(back, value);
        wire
    }

    fn tagged(tag: &str, payload: Value) -> Value {
        [(tag, payload)].into_iter().collect()
    }

    #[test]
    fn every_builtin_round_trips() {
        let registry = ScalarRegistry::default();
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
        let values = vec![
            Value::Uuid(Uuid::new_v4()),
            Value::ObjectId(ObjectId::new()),
            Value::Timestamp(ts),
            Value::Timestamp(ts + Duration::nanoseconds(123_456_789)),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
            Value::Time(NaiveTime::from_hms_nano_opt(23, 59, 1, 5).unwrap()),
            Value::Duration(CalendarDuration::new(14, 3, 3_600_000_000_000).unwrap()),
            Value::Inet(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
            Value::Inet(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            Value::Blob(Blob::from(vec![0u8, 1, 2, 255])),
            Value::Vector(Vector::new(vec![0.1, -2.5, 3.0])),
        ];
        for value in values {
            round_trip(&registry, value);
        }
    }

    #[test]
    fn millisecond_timestamps_are_numbers() {
        let registry = ScalarRegistry::default();
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let wire = round_trip(&registry, Value::Timestamp(ts));
        assert_eq!(wire, tagged("$date", Value::Integer(1_700_000_000_123)));

        let fine = NaiveDateTime::parse_from_str("2024-01-01 00:00:00.000000001", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap()
            .and_utc();
        let wire = round_trip(&registry, Value::Timestamp(fine));
        assert_eq!(
            wire,
            tagged("$date", Value::from("2024-01-01T00:00:00.000000001Z"))
        );
    }

    #[test]
    fn local_time_drops_zero_fraction() {
        let registry = ScalarRegistry::default();
        let wire = round_trip(
            &registry,
            Value::Time(NaiveTime::from_hms_opt(8, 5, 0).unwrap()),
        );
        assert_eq!(wire, tagged("$localTime", Value::from("08:05:00")));
    }

    #[test]
    fn binary_vectors_and_either_form_on_read() {
        let binary = ScalarRegistry::new(VectorEncoding::Binary);
        let vector = Value::Vector(Vector::new(vec![1.0, 2.0]));
        let wire = round_trip(&binary, vector.clone());
        assert!(matches!(&wire.as_map().unwrap()["$vector"], Value::String(_)));

        let from_array = binary
            .from_wire(&tagged("$vector", Value::from(vec![1i64, 2])))
            .unwrap()
            .unwrap();
        assert_eq!(from_array, vector);
    }

    #[test]
    fn durations_accept_iso_on_read() {
        let registry = ScalarRegistry::default();
        let decoded = registry
            .from_wire(&tagged("$duration", Value::from("P1DT2H")))
            .unwrap()
            .unwrap();
        assert_eq!(
            decoded,
            Value::Duration(CalendarDuration::new(0, 1, 7_200_000_000_000).unwrap())
        );
    }

    #[test]
    fn non_tags_are_not_decoded() {
        let registry = ScalarRegistry::default();
        assert!(registry.from_wire(&tagged("uuid", Value::from("x"))).is_none());
        let two_keys: Value = [("$uuid", "x"), ("other", "y")].into_iter().collect();
        assert!(registry.from_wire(&two_keys).is_none());
        assert!(registry.from_wire(&Value::from("$uuid")).is_none());
        assert!(registry.to_wire(&Value::from("plain")).is_none());
    }

    #[test]
    fn malformed_payloads_are_errors() {
        let registry = ScalarRegistry::default();
        let err = registry
            .from_wire(&tagged("$uuid", Value::Integer(3)))
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("expects a UUID string"));

        assert!(registry
            .from_wire(&tagged("$objectId", Value::from("zz")))
            .unwrap()
            .is_err());
        assert!(registry
            .from_wire(&tagged("$localDate", Value::from("2024-13-01")))
            .unwrap()
            .is_err());
    }

    #[test]
    fn non_finite_vector_components_are_rejected() {
        let registry = ScalarRegistry::default();
        let err = registry
            .to_wire(&Value::Vector(Vector::new(vec![f32::NAN])))
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ScalarError::Invalid { tag: "$vector", .. }));
    }

    #[test]
    fn register_replaces_by_kind() {
        struct EpochSeconds;
        impl ScalarType for EpochSeconds {
            fn kind(&self) -> ValueKind {
                ValueKind::Timestamp
            }
            fn tag(&self) -> &'static str {
                "$epoch"
            }
            fn to_wire(&self, value: &Value) -> Result<Value, ScalarError> {
                match value {
                    Value::Timestamp(ts) => Ok(Value::Integer(ts.timestamp())),
                    other => Err(ScalarError::WrongKind(other.kind())),
                }
            }
            fn from_wire(&self, payload: &Value) -> Result<Value, ScalarError> {
                match payload {
                    Value::Integer(s) => Ok(Value::Timestamp(Utc.timestamp_opt(*s, 0).unwrap())),
                    other => Err(ScalarError::WrongKind(other.kind())),
                }
            }
        }

        let mut registry = ScalarRegistry::default();
        registry.register(Arc::new(EpochSeconds));
        assert!(registry.by_tag("$date").is_none());
        let ts = Utc.timestamp_opt(1_000, 0).unwrap();
        let wire = round_trip(&registry, Value::Timestamp(ts));
        assert_eq!(wire, tagged("$epoch", Value::Integer(1_000)));
    }
}
