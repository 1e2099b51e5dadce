//! Codecs: path- or type-scoped customization of (de)serialization.
//!
//! A codec pairs a [`MatchRule`] with a serialize and a deserialize
//! function. At every node the engine runs the codecs whose rule matches, in
//! priority order, and each one answers with a [`ControlSignal`].

use std::fmt;
use std::sync::Arc;

use docwire_core::{Path, PathPattern, Value, ValueKind};

use crate::context::SerDesContext;

/// Error type codec functions may fail with.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// What the engine should do after a codec ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// The codec does not apply; try the next one with the value unchanged.
    Nevermind,
    /// Keep going: try the remaining codecs (with the returned value, if
    /// any), then descend into the value if it is a container.
    Continue,
    /// The returned value is final: no more codecs, no descent.
    Done,
}

/// A codec's answer: a signal plus an optional replacement value.
///
/// `Done` requires a value and `Nevermind` forbids one; the engine reports
/// anything else as a contract violation.
#[derive(Clone, Debug, PartialEq)]
pub struct CodecOutput {
    pub signal: ControlSignal,
    pub value: Option<Value>,
}

impl CodecOutput {
    pub fn nevermind() -> Self {
        CodecOutput {
            signal: ControlSignal::Nevermind,
            value: None,
        }
    }

    /// Continue with the value unchanged.
    pub fn keep() -> Self {
        CodecOutput {
            signal: ControlSignal::Continue,
            value: None,
        }
    }

    /// Continue with a replacement value.
    pub fn replace(value: impl Into<Value>) -> Self {
        CodecOutput {
            signal: ControlSignal::Continue,
            value: Some(value.into()),
        }
    }

    pub fn done(value: impl Into<Value>) -> Self {
        CodecOutput {
            signal: ControlSignal::Done,
            value: Some(value.into()),
        }
    }
}

/// Which of the three priority classes a rule belongs to.
///
/// The engine tries path codecs, then type codecs, then wildcards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
    Path,
    Type,
    Wildcard,
}

/// Predicate used by [`MatchRule::Guard`].
pub type Guard = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Where a codec applies.
#[derive(Clone)]
pub enum MatchRule {
    /// Nodes whose path matches the pattern.
    Path(PathPattern),
    /// Nodes whose last path segment is this map key, at any depth.
    Name(String),
    /// Values of this kind.
    ///
    /// Deserialize codecs see the wire shape, so a tagged rich scalar is
    /// still a `Map` when they run; match it with [`MatchRule::Tag`].
    Kind(ValueKind),
    /// Tagged wire objects: single-key maps whose key is this tag, such as
    /// `{"$uuid": "..."}`.
    Tag(String),
    /// Custom values with this type name.
    CustomType(String),
    /// Values the predicate accepts.
    Guard(Guard),
    /// The document root only.
    Root,
    /// Every node.
    Any,
}

impl MatchRule {
    pub fn class(&self) -> PriorityClass {
        match self {
            MatchRule::Path(_) | MatchRule::Name(_) => PriorityClass::Path,
            MatchRule::Kind(_)
            | MatchRule::Tag(_)
            | MatchRule::CustomType(_)
            | MatchRule::Guard(_) => PriorityClass::Type,
            MatchRule::Root | MatchRule::Any => PriorityClass::Wildcard,
        }
    }

    pub fn matches(&self, path: &Path, value: &Value) -> bool {
        match self {
            MatchRule::Path(pattern) => pattern.matches(path),
            MatchRule::Name(name) => path.last_key() == Some(name.as_str()),
            MatchRule::Kind(kind) => value.kind() == *kind,
            MatchRule::Tag(tag) => {
                matches!(value, Value::Map(map) if map.len() == 1 && map.contains_key(tag.as_str()))
            }
            MatchRule::CustomType(name) => {
                matches!(value, Value::Custom(c) if c.type_name() == name)
            }
            MatchRule::Guard(guard) => guard(value),
            MatchRule::Root => path.is_empty(),
            MatchRule::Any => true,
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Path(p) => write!(f, "Path({})", p),
            MatchRule::Name(n) => write!(f, "Name({})", n),
            MatchRule::Kind(k) => write!(f, "Kind({})", k),
            MatchRule::Tag(t) => write!(f, "Tag({})", t),
            MatchRule::CustomType(t) => write!(f, "CustomType({})", t),
            MatchRule::Guard(_) => f.write_str("Guard"),
            MatchRule::Root => f.write_str("Root"),
            MatchRule::Any => f.write_str("Any"),
        }
    }
}

/// A unit of serialization customization.
///
/// Both directions default to [`CodecOutput::nevermind`], so a codec only
/// implements the side it cares about.
///
/// # Example
///
/// ```rust
/// use docwire_core::{Value, ValueKind};
/// use docwire_serdes::{Codec, CodecError, CodecOutput, MatchRule, SerDesContext};
///
/// /// Sends durations as whole seconds.
/// struct DurationAsSeconds(MatchRule);
///
/// impl Codec for DurationAsSeconds {
///     fn rule(&self) -> &MatchRule {
///         &self.0
///     }
///
///     fn serialize(&self, value: &Value, _ctx: &SerDesContext<'_>) -> Result<CodecOutput, CodecError> {
///         match value {
///             Value::Duration(d) => Ok(CodecOutput::done(d.nanoseconds() / 1_000_000_000)),
///             _ => Ok(CodecOutput::nevermind()),
///         }
///     }
/// }
///
/// let codec = DurationAsSeconds(MatchRule::Kind(ValueKind::Duration));
/// assert_eq!(codec.rule().class(), docwire_serdes::PriorityClass::Type);
/// ```
pub trait Codec: Send + Sync {
    fn rule(&self) -> &MatchRule;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn serialize(&self, value: &Value, ctx: &SerDesContext<'_>) -> Result<CodecOutput, CodecError> {
        let _ = (value, ctx);
        Ok(CodecOutput::nevermind())
    }

    fn deserialize(
        &self,
        value: &Value,
        ctx: &SerDesContext<'_>,
    ) -> Result<CodecOutput, CodecError> {
        let _ = (value, ctx);
        Ok(CodecOutput::nevermind())
    }
}

type CodecFn =
    Arc<dyn Fn(&Value, &SerDesContext<'_>) -> Result<CodecOutput, CodecError> + Send + Sync>;

/// A codec assembled from closures.
///
/// ```rust
/// use docwire_core::{pattern, Value};
/// use docwire_serdes::{CodecOutput, FnCodec};
///
/// let upper = FnCodec::for_path(pattern!("name"))
///     .named("upper-name")
///     .on_serialize(|value, _ctx| match value {
///         Value::String(s) => Ok(CodecOutput::done(s.to_uppercase())),
///         _ => Ok(CodecOutput::nevermind()),
///     });
/// # let _ = upper;
/// ```
#[derive(Clone)]
pub struct FnCodec {
    name: String,
    rule: MatchRule,
    serialize: Option<CodecFn>,
    deserialize: Option<CodecFn>,
}

impl FnCodec {
    pub fn new(rule: MatchRule) -> Self {
        FnCodec {
            name: format!("{:?}", rule),
            rule,
            serialize: None,
            deserialize: None,
        }
    }

    pub fn for_path(pattern: PathPattern) -> Self {
        Self::new(MatchRule::Path(pattern))
    }

    pub fn for_name(name: impl Into<String>) -> Self {
        Self::new(MatchRule::Name(name.into()))
    }

    pub fn for_kind(kind: ValueKind) -> Self {
        Self::new(MatchRule::Kind(kind))
    }

    pub fn for_tag(tag: impl Into<String>) -> Self {
        Self::new(MatchRule::Tag(tag.into()))
    }

    pub fn for_custom_type(type_name: impl Into<String>) -> Self {
        Self::new(MatchRule::CustomType(type_name.into()))
    }

    pub fn for_guard(guard: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::new(MatchRule::Guard(Arc::new(guard)))
    }

    pub fn for_root() -> Self {
        Self::new(MatchRule::Root)
    }

    pub fn for_any() -> Self {
        Self::new(MatchRule::Any)
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn on_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &SerDesContext<'_>) -> Result<CodecOutput, CodecError>
            + Send
            + Sync
            + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &SerDesContext<'_>) -> Result<CodecOutput, CodecError>
            + Send
            + Sync
            + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }
}

impl Codec for FnCodec {
    fn rule(&self) -> &MatchRule {
        &self.rule
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self, value: &Value, ctx: &SerDesContext<'_>) -> Result<CodecOutput, CodecError> {
        match &self.serialize {
            Some(f) => f(value, ctx),
            None => Ok(CodecOutput::nevermind()),
        }
    }

    fn deserialize(
        &self,
        value: &Value,
        ctx: &SerDesContext<'_>,
    ) -> Result<CodecOutput, CodecError> {
        match &self.deserialize {
            Some(f) => f(value, ctx),
            None => Ok(CodecOutput::nevermind()),
        }
    }
}

impl fmt::Debug for FnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}
