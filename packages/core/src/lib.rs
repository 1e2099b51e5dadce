//! docwire core: the application-side document model
//!
//! - `Path` / `PathPattern`: where a value lives, and how codecs address it
//! - `Value`: the document tree, with rich scalars as first-class variants
//! - `types`: the rich scalar types not provided by `chrono`, `uuid` or the
//!   big-number crates
//!
//! # Example
//!
//! ```rust
//! use docwire_core::{path, Value};
//!
//! let mut doc = Value::map();
//! doc.set(&path!("owner.name"), Value::from("Ada")).unwrap();
//! assert_eq!(doc.get(&path!("owner.name")), Some(&Value::from("Ada")));
//! ```

pub use bigdecimal::BigDecimal;
pub use bytes::Bytes;
pub use num_bigint::BigInt;
pub use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
pub use uuid::Uuid;

mod error;
mod path;
pub mod types;
mod value;

pub use error::Error;
pub use path::{Path, PathError, PathPattern, PatternSegment, Segment};
pub use types::{Blob, CalendarDuration, CustomValue, ObjectId, TypeError, Vector};
pub use value::{Map, Value, ValueKind};
