//! Map key renaming between application and wire naming conventions.

use std::borrow::Cow;

use docwire_core::Path;

/// Renames map keys on their way to and from the wire.
///
/// Applied to each map key exactly once per traversal, never to sequence
/// indices or string values. `from_wire(to_wire(k)) == k` must hold for
/// every key `to_wire` is given; when serializing, the engine reports a key
/// that does not come back as [`Error::IrreversibleKey`] and two keys that
/// land on the same wire key as [`Error::KeyCollision`].
///
/// [`Error::IrreversibleKey`]: crate::Error::IrreversibleKey
/// [`Error::KeyCollision`]: crate::Error::KeyCollision
pub trait KeyTransformer: Send + Sync {
    fn to_wire<'k>(&self, key: &'k str) -> Cow<'k, str>;

    fn from_wire<'k>(&self, key: &'k str) -> Cow<'k, str>;

    /// Whether keys of the map at `parent` are renamed at all.
    fn applies_at(&self, parent: &Path) -> bool {
        let _ = parent;
        true
    }

    /// True when both directions return every key unchanged. Lets the
    /// engine skip collision bookkeeping.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Leaves keys alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityKeys;

impl KeyTransformer for IdentityKeys {
    fn to_wire<'k>(&self, key: &'k str) -> Cow<'k, str> {
        Cow::Borrowed(key)
    }

    fn from_wire<'k>(&self, key: &'k str) -> Cow<'k, str> {
        Cow::Borrowed(key)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// `camelCase` in the application, `snake_case` on the wire.
///
/// Only camelCase keys are renamed. A key that already contains an
/// underscore cannot be told apart from a renamed one on the way back, so
/// serializing one is refused by the engine.
///
/// ```rust
/// use docwire_serdes::{CamelSnakeCase, KeyTransformer};
///
/// let keys = CamelSnakeCase::default();
/// assert_eq!(keys.to_wire("pastOwners"), "past_owners");
/// assert_eq!(keys.from_wire("past_owners"), "pastOwners");
/// assert_eq!(keys.to_wire("_id"), "_id");
/// ```
#[derive(Clone, Debug)]
pub struct CamelSnakeCase {
    exempt: Vec<String>,
    nested: bool,
}

impl Default for CamelSnakeCase {
    fn default() -> Self {
        CamelSnakeCase {
            exempt: vec!["_id".to_string()],
            nested: true,
        }
    }
}

impl CamelSnakeCase {
    /// Only rename keys of the root map.
    #[must_use]
    pub fn top_level_only(mut self) -> Self {
        self.nested = false;
        self
    }

    /// Never rename `key`.
    #[must_use]
    pub fn exempt(mut self, key: impl Into<String>) -> Self {
        self.exempt.push(key.into());
        self
    }

    fn is_exempt(&self, key: &str) -> bool {
        self.exempt.iter().any(|k| k == key)
    }
}

impl KeyTransformer for CamelSnakeCase {
    /// Keys that are not camelCase (a capital first letter, or an
    /// underscore after the leading ones) are passed through unchanged.
    fn to_wire<'k>(&self, key: &'k str) -> Cow<'k, str> {
        let body_start = key.len() - key.trim_start_matches('_').len();
        let body = &key[body_start..];
        if self.is_exempt(key)
            || body.contains('_')
            || body.starts_with(|c: char| c.is_ascii_uppercase())
            || !body.chars().any(|c| c.is_ascii_uppercase())
        {
            return Cow::Borrowed(key);
        }
        let mut out = String::with_capacity(key.len() + 4);
        out.push_str(&key[..body_start]);
        for c in body.chars() {
            if c.is_ascii_uppercase() {
                out.push('_');
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
        }
        Cow::Owned(out)
    }

    fn from_wire<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.is_exempt(key) || !key.contains('_') {
            return Cow::Borrowed(key);
        }
        // Leading underscores are kept as they are.
        let body_start = key.len() - key.trim_start_matches('_').len();
        let mut out = String::with_capacity(key.len());
        out.push_str(&key[..body_start]);
        let mut upper_next = false;
        for c in key[body_start..].chars() {
            if c == '_' {
                upper_next = true;
            } else if upper_next {
                out.push(c.to_ascii_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        }
        if upper_next {
            out.push('_');
        }
        Cow::Owned(out)
    }

    fn applies_at(&self, parent: &Path) -> bool {
        self.nested || parent.is_empty()
    }
}
