//! Rich scalar types that have no direct JSON counterpart.
//!
//! Timestamps, dates, times, UUIDs, IP addresses and arbitrary-precision
//! numbers come from `chrono`, `uuid`, `std::net`, `num-bigint` and
//! `bigdecimal`. The types defined here cover what those crates don't.

mod blob;
mod custom;
mod duration;
mod object_id;
mod vector;

pub use blob::Blob;
pub use custom::CustomValue;
pub use duration::CalendarDuration;
pub use object_id::ObjectId;
pub use vector::Vector;

/// Errors raised while parsing or constructing a rich scalar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("invalid object id '{input}': {reason}")]
    ObjectId { input: String, reason: &'static str },

    #[error("invalid duration '{input}': {reason}")]
    Duration { input: String, reason: String },

    #[error("duration components must all have the same sign")]
    MixedSigns,

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("binary vector length {0} is not a multiple of 4")]
    VectorLength(usize),
}
