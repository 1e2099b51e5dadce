use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use super::TypeError;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A 12-byte document identifier: 4 bytes of big-endian epoch seconds
/// followed by 8 bytes of process-unique data.
///
/// The text form is 24 lowercase hex characters.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a new identifier stamped with the current time.
    pub fn new() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = uuid::Uuid::new_v4();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&random.as_bytes()[..5]);
        bytes[9..].copy_from_slice(&count[1..]);
        ObjectId(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// The creation time encoded in the first four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(secs as i64, 0).unwrap_or_default()
    }

    /// Parse 24 hex characters (either case).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let err = |reason| TypeError::ObjectId {
            input: s.to_string(),
            reason,
        };
        if s.len() != 24 {
            return Err(err("expected 24 hex characters"));
        }

        let mut bytes = [0u8; 12];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or_else(|| err("non-hex character"))?;
            let lo = hex_value(pair[1]).ok_or_else(|| err("non-hex character"))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(ObjectId(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id = ObjectId::parse("65A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(id.to_string(), "65a1b2c3d4e5f60718293a4b");
        assert_eq!(id.bytes()[0], 0x65);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            ObjectId::parse("abc"),
            Err(TypeError::ObjectId { reason, .. }) if reason.contains("24")
        ));
        assert!(ObjectId::parse("zz0000000000000000000000").is_err());
    }

    #[test]
    fn timestamp_comes_from_leading_bytes() {
        let id = ObjectId::from_bytes([0, 0, 0, 60, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(id.timestamp().timestamp(), 60);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        assert!((Utc::now() - a.timestamp()).num_seconds() < 5);
    }
}
