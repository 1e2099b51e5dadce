//! Codec-driven serialization for docwire documents
//!
//! This layer turns application documents ([`Value`] trees with rich
//! scalars) into JSON wire documents and back. It adds:
//! - `SerDes`: the traversal engine, copy or in-place, in both directions
//! - `Codec` / `FnCodec`: path- or type-scoped overrides, tried in priority
//!   order at every node
//! - `KeyTransformer`: map key renaming (`CamelSnakeCase` built in)
//! - `NumberPolicy`: how wire numbers are represented, per path
//! - `ScalarRegistry`: tagged wire encodings for rich scalars
//! - Value <-> serde conversions
//!
//! # Example
//!
//! ```rust
//! use docwire_core::{pattern, Value};
//! use docwire_serdes::{CamelSnakeCase, CodecOutput, FnCodec, SerDes, SerDesConfig};
//! use serde_json::json;
//!
//! let config = SerDesConfig::builder()
//!     .key_transformer(CamelSnakeCase::default())
//!     .codec(FnCodec::for_path(pattern!("password")).on_serialize(|_, _| {
//!         Ok(CodecOutput::done("***"))
//!     }))
//!     .build();
//! let serdes = SerDes::new(config);
//!
//! let mut user = serdes.deserialize_json(json!({"user_name": "ada", "password": "x"})).unwrap();
//! assert_eq!(user.as_map().unwrap()["userName"], Value::from("ada"));
//!
//! let wire = serdes.serialize_to_json(&mut user).unwrap();
//! assert_eq!(wire, json!({"user_name": "ada", "password": "***"}));
//! ```
//!
//! # Logging
//!
//! Codec decisions are logged through the `log` facade at trace level and
//! aborted traversals at debug level. No logger is installed.

pub use bytes::Bytes;

mod codec;
mod config;
mod context;
mod engine;
mod error;
mod json;
mod keys;
mod numbers;
mod registry;
mod scalars;

pub use codec::{
    Codec, CodecError, CodecOutput, ControlSignal, FnCodec, Guard, MatchRule, PriorityClass,
};
pub use config::{
    KeyCase, NumbersOption, SerDesConfig, SerDesConfigBuilder, SerDesOptions, DEFAULT_MAX_DEPTH,
};
pub use context::{Direction, SerDesContext};
pub use engine::SerDes;
pub use error::Error;
pub use json::{from_value, json_to_value, to_value, value_to_json};
pub use keys::{CamelSnakeCase, IdentityKeys, KeyTransformer};
pub use numbers::{NumberCallback, NumberPolicy, NumberRepr};
pub use registry::CodecRegistry;
pub use scalars::{
    BlobType, DateType, DurationType, InetType, ObjectIdType, ScalarError, ScalarRegistry,
    ScalarType, TimeType, TimestampType, UuidType, VectorEncoding, VectorType,
};

// Re-export core types for convenience
pub use docwire_core::{Path, PathPattern, Value, ValueKind};
