//! SerDes configuration.
//!
//! A [`SerDesConfig`] is assembled once, in code, through
//! [`SerDesConfigBuilder`]. The data-only knobs can also come from a
//! caller's own configuration file as [`SerDesOptions`].

use std::sync::Arc;

use docwire_core::{PathError, PathPattern};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::codec::Codec;
use crate::keys::{CamelSnakeCase, IdentityKeys, KeyTransformer};
use crate::numbers::{NumberPolicy, NumberRepr};
use crate::registry::CodecRegistry;
use crate::scalars::{ScalarRegistry, ScalarType, VectorEncoding};

/// Default nesting limit. Documents deeper than this are reported as
/// malformed.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Everything a traversal needs besides the document.
///
/// Immutable once built; share it between threads through the
/// [`crate::SerDes`] handle that owns it.
#[derive(Clone)]
pub struct SerDesConfig {
    codecs: CodecRegistry,
    keys: Arc<dyn KeyTransformer>,
    numbers: NumberPolicy,
    mutate_in_place: bool,
    max_depth: usize,
    scalars: ScalarRegistry,
}

impl SerDesConfig {
    pub fn builder() -> SerDesConfigBuilder {
        SerDesConfigBuilder::default()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn key_transformer(&self) -> &dyn KeyTransformer {
        self.keys.as_ref()
    }

    pub fn numbers(&self) -> &NumberPolicy {
        &self.numbers
    }

    /// Whether the command-layer entry points rewrite the caller's tree
    /// instead of copying it.
    pub fn mutate_in_place(&self) -> bool {
        self.mutate_in_place
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn scalars(&self) -> &ScalarRegistry {
        &self.scalars
    }
}

impl Default for SerDesConfig {
    fn default() -> Self {
        SerDesConfigBuilder::default().build()
    }
}

impl std::fmt::Debug for SerDesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerDesConfig")
            .field("codecs", &self.codecs)
            .field("identity_keys", &self.keys.is_identity())
            .field("numbers", &self.numbers)
            .field("mutate_in_place", &self.mutate_in_place)
            .field("max_depth", &self.max_depth)
            .field("scalars", &self.scalars)
            .finish()
    }
}

/// Builder for [`SerDesConfig`].
///
/// ```rust
/// use docwire_core::pattern;
/// use docwire_serdes::{CamelSnakeCase, NumberPolicy, NumberRepr, SerDesConfig};
///
/// let config = SerDesConfig::builder()
///     .key_transformer(CamelSnakeCase::default())
///     .numbers(NumberPolicy::per_path(NumberRepr::Number).with(pattern!("balance"), NumberRepr::Decimal))
///     .max_depth(64)
///     .build();
/// assert_eq!(config.max_depth(), 64);
/// ```
pub struct SerDesConfigBuilder {
    codecs: CodecRegistry,
    keys: Arc<dyn KeyTransformer>,
    numbers: NumberPolicy,
    mutate_in_place: bool,
    max_depth: usize,
    vector_encoding: VectorEncoding,
    scalar_types: Vec<Arc<dyn ScalarType>>,
}

impl Default for SerDesConfigBuilder {
    fn default() -> Self {
        SerDesConfigBuilder {
            codecs: CodecRegistry::new(),
            keys: Arc::new(IdentityKeys),
            numbers: NumberPolicy::default(),
            mutate_in_place: false,
            max_depth: DEFAULT_MAX_DEPTH,
            vector_encoding: VectorEncoding::default(),
            scalar_types: Vec::new(),
        }
    }
}

impl SerDesConfigBuilder {
    /// Register a codec after those already added.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.register(codec);
        self
    }

    /// Append every codec of `codecs`, keeping their order.
    pub fn codecs(mut self, codecs: &CodecRegistry) -> Self {
        for codec in codecs.iter_shared() {
            self.codecs.register_shared(codec);
        }
        self
    }

    pub fn key_transformer(mut self, keys: impl KeyTransformer + 'static) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn numbers(mut self, policy: impl Into<NumberPolicy>) -> Self {
        self.numbers = policy.into();
        self
    }

    pub fn mutate_in_place(mut self, enabled: bool) -> Self {
        self.mutate_in_place = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn vector_encoding(mut self, encoding: VectorEncoding) -> Self {
        self.vector_encoding = encoding;
        self
    }

    /// Replace the built-in encoding of one rich scalar kind.
    pub fn scalar_type(mut self, scalar: impl ScalarType + 'static) -> Self {
        self.scalar_types.push(Arc::new(scalar));
        self
    }

    /// Apply data-only options on top of what has been set so far.
    ///
    /// # Errors
    ///
    /// Returns an error if a per-path number pattern does not parse.
    pub fn apply_options(mut self, options: &SerDesOptions) -> Result<Self, PathError> {
        if let Some(numbers) = &options.numbers {
            self.numbers = numbers.to_policy()?;
        }
        if let Some(enabled) = options.mutate_in_place {
            self.mutate_in_place = enabled;
        }
        match options.key_case {
            Some(KeyCase::Identity) => self.keys = Arc::new(IdentityKeys),
            Some(KeyCase::SnakeCase) => self.keys = Arc::new(CamelSnakeCase::default()),
            None => {}
        }
        if let Some(encoding) = options.vector_encoding {
            self.vector_encoding = encoding;
        }
        if let Some(depth) = options.max_depth {
            self.max_depth = depth;
        }
        Ok(self)
    }

    pub fn build(self) -> SerDesConfig {
        let mut scalars = ScalarRegistry::new(self.vector_encoding);
        for scalar in self.scalar_types {
            scalars.register(scalar);
        }
        SerDesConfig {
            codecs: self.codecs,
            keys: self.keys,
            numbers: self.numbers,
            mutate_in_place: self.mutate_in_place,
            max_depth: self.max_depth,
            scalars,
        }
    }
}

/// Wire naming convention for map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    Identity,
    /// `camelCase` keys in the application, `snake_case` on the wire.
    SnakeCase,
}

/// Number representation as written in options: one representation for
/// every path, or a map from path patterns to representations where the
/// key `"*"` is the default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumbersOption {
    Constant(NumberRepr),
    PerPath(IndexMap<String, NumberRepr>),
}

impl NumbersOption {
    pub fn to_policy(&self) -> Result<NumberPolicy, PathError> {
        match self {
            NumbersOption::Constant(repr) => Ok(NumberPolicy::Constant(*repr)),
            NumbersOption::PerPath(map) => {
                let default = map.get("*").copied().unwrap_or_default();
                map.iter()
                    .filter(|(pattern, _)| pattern.as_str() != "*")
                    .try_fold(NumberPolicy::per_path(default), |policy, (pattern, repr)| {
                        Ok(policy.with(PathPattern::parse(pattern)?, *repr))
                    })
            }
        }
    }
}

/// Data-only configuration, for embedding in a caller's configuration
/// file. Unset fields leave the builder's value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerDesOptions {
    #[serde(default)]
    pub numbers: Option<NumbersOption>,

    #[serde(default)]
    pub mutate_in_place: Option<bool>,

    #[serde(default)]
    pub key_case: Option<KeyCase>,

    #[serde(default)]
    pub vector_encoding: Option<VectorEncoding>,

    #[serde(default)]
    pub max_depth: Option<usize>,
}
