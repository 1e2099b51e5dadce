//! The traversal engine.
//!
//! Both directions walk the tree depth-first, pre-order. At each node the
//! matching codecs run first, in priority order; unless one of them answers
//! `Done`, the engine then descends into containers (renaming map keys on
//! the way) or applies the default encoding to leaves.
//!
//! There are two realizations of the walk. The in-place one rewrites the
//! caller's tree node by node. The copy one only reads the input and builds
//! a new tree; once a codec hands back a replacement value that value is
//! owned by the engine, so the rest of that subtree is rewritten in place.

use std::borrow::Cow;

use bytes::Bytes;
use docwire_core::{Map, Value, ValueKind};

use crate::codec::ControlSignal;
use crate::config::SerDesConfig;
use crate::context::{Direction, SerDesContext};
use crate::error::Error;
use crate::json::{json_to_value, value_to_json};
use crate::numbers::NumberRepr;

/// Result of running the codec chain at one node.
enum Applied {
    /// No codec changed the value.
    Keep,
    /// The chain produced a new value; descent continues into it.
    Replace(Value),
    /// A codec finished the node.
    Done(Value),
}

/// A configured serializer/deserializer.
///
/// Cheap to share: wrap it in an `Arc` and call it from any number of
/// threads. Every call gets its own [`SerDesContext`].
///
/// ```rust
/// use docwire_core::{Uuid, Value};
/// use docwire_serdes::SerDes;
/// use serde_json::json;
///
/// let serdes = SerDes::default();
/// let mut doc: Value = [("id", Value::Uuid(Uuid::nil())), ("n", Value::from(1i64))]
///     .into_iter()
///     .collect();
///
/// let wire = serdes.serialize_to_json(&mut doc).unwrap();
/// assert_eq!(wire, json!({"id": {"$uuid": "00000000-0000-0000-0000-000000000000"}, "n": 1}));
///
/// let back = serdes.deserialize_json(wire).unwrap();
/// assert_eq!(back, doc);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SerDes {
    config: SerDesConfig,
}

impl SerDes {
    pub fn new(config: SerDesConfig) -> Self {
        SerDes { config }
    }

    pub fn config(&self) -> &SerDesConfig {
        &self.config
    }

    /// Serialize a copy of `document`. The input is not modified at any
    /// depth.
    pub fn serialize(&self, document: &Value) -> Result<Value, Error> {
        let mut ctx = SerDesContext::new(&self.config, Direction::Serialize, false);
        self.visit_copy(document, &mut ctx)
            .map_err(|e| aborted(Direction::Serialize, e))
    }

    /// Serialize `document` by rewriting it.
    ///
    /// On error the document may be partly rewritten and should be
    /// discarded.
    pub fn serialize_in_place(&self, document: &mut Value) -> Result<(), Error> {
        let mut ctx = SerDesContext::new(&self.config, Direction::Serialize, true);
        self.visit_mut(document, &mut ctx)
            .map_err(|e| aborted(Direction::Serialize, e))
    }

    /// Deserialize a copy of `wire`. The input is not modified at any depth.
    pub fn deserialize(&self, wire: &Value) -> Result<Value, Error> {
        let mut ctx = SerDesContext::new(&self.config, Direction::Deserialize, false);
        self.visit_copy(wire, &mut ctx)
            .map_err(|e| aborted(Direction::Deserialize, e))
    }

    /// Deserialize `wire` by rewriting it.
    ///
    /// On error the value may be partly rewritten and should be discarded.
    pub fn deserialize_in_place(&self, wire: &mut Value) -> Result<(), Error> {
        let mut ctx = SerDesContext::new(&self.config, Direction::Deserialize, true);
        self.visit_mut(wire, &mut ctx)
            .map_err(|e| aborted(Direction::Deserialize, e))
    }

    /// Serialize to a JSON value, rewriting `document` when the config asks
    /// for in-place mutation and leaving it untouched otherwise.
    pub fn serialize_to_json(&self, document: &mut Value) -> Result<serde_json::Value, Error> {
        if self.config.mutate_in_place() {
            self.serialize_in_place(document)?;
            value_to_json(document)
        } else {
            value_to_json(&self.serialize(document)?)
        }
    }

    /// Serialize to a JSON request body.
    pub fn serialize_to_body(&self, document: &mut Value) -> Result<Bytes, Error> {
        let json = self.serialize_to_json(document)?;
        Ok(Bytes::from(serde_json::to_vec(&json)?))
    }

    pub fn deserialize_json(&self, json: serde_json::Value) -> Result<Value, Error> {
        let mut value = json_to_value(json);
        self.deserialize_in_place(&mut value)?;
        Ok(value)
    }

    /// Deserialize a JSON response body.
    pub fn deserialize_body(&self, body: &[u8]) -> Result<Value, Error> {
        let json: serde_json::Value = serde_json::from_slice(body)?;
        self.deserialize_json(json)
    }

    fn visit_mut(&self, value: &mut Value, ctx: &mut SerDesContext<'_>) -> Result<(), Error> {
        match self.apply_codecs(value, ctx)? {
            Applied::Done(done) => {
                *value = done;
                return Ok(());
            }
            Applied::Replace(replaced) => *value = replaced,
            Applied::Keep => {}
        }
        self.descend_mut(value, ctx)
    }

    fn visit_copy(&self, value: &Value, ctx: &mut SerDesContext<'_>) -> Result<Value, Error> {
        match self.apply_codecs(value, ctx)? {
            Applied::Done(done) => Ok(done),
            Applied::Replace(mut replaced) => {
                self.descend_mut(&mut replaced, ctx)?;
                Ok(replaced)
            }
            Applied::Keep => self.descend_copy(value, ctx),
        }
    }

    /// Run every matching codec at the current node.
    ///
    /// Type rules are checked against the value as it stands when the codec
    /// is reached, so a `Continue` replacement changes which later codecs
    /// apply.
    fn apply_codecs(&self, value: &Value, ctx: &SerDesContext<'_>) -> Result<Applied, Error> {
        let mut current = Cow::Borrowed(value);

        for codec in self.config.codecs().in_priority_order() {
            if !codec.rule().matches(ctx.path(), &current) {
                continue;
            }

            let output = match ctx.direction() {
                Direction::Serialize => codec.serialize(&current, ctx),
                Direction::Deserialize => codec.deserialize(&current, ctx),
            }
            .map_err(|source| Error::Codec {
                path: ctx.path().clone(),
                codec: codec.name().to_string(),
                source,
            })?;

            log::trace!(
                "codec '{}' at '{}': {:?}{}",
                codec.name(),
                ctx.path(),
                output.signal,
                if output.value.is_some() { " (with value)" } else { "" }
            );

            let violation = |message: &str| Error::CodecContractViolation {
                path: ctx.path().clone(),
                codec: codec.name().to_string(),
                message: message.to_string(),
            };

            match (output.signal, output.value) {
                (ControlSignal::Nevermind, None) | (ControlSignal::Continue, None) => {}
                (ControlSignal::Nevermind, Some(_)) => {
                    return Err(violation("Nevermind must not carry a value"));
                }
                (ControlSignal::Continue, Some(replaced)) => current = Cow::Owned(replaced),
                (ControlSignal::Done, None) => {
                    return Err(violation("Done must carry a value"));
                }
                (ControlSignal::Done, Some(done)) => {
                    if ctx.is_serializing() && !done.is_plain() {
                        return Err(violation(&format!(
                            "Done value is a {} and has no wire form",
                            first_unplain(&done)
                        )));
                    }
                    return Ok(Applied::Done(done));
                }
            }
        }

        Ok(match current {
            Cow::Borrowed(_) => Applied::Keep,
            Cow::Owned(replaced) => Applied::Replace(replaced),
        })
    }

    fn descend_mut(&self, value: &mut Value, ctx: &mut SerDesContext<'_>) -> Result<(), Error> {
        match value {
            Value::Map(map) => {
                if let Some(decoded) = self.decode_tagged(map, ctx)? {
                    *value = decoded;
                    return Ok(());
                }
                if !self.renames_keys(ctx) {
                    for (key, child) in map.iter_mut() {
                        ctx.enter(key.as_str())?;
                        self.visit_mut(child, ctx)?;
                        ctx.leave();
                    }
                    return Ok(());
                }

                let entries = std::mem::take(map);
                let mut out = Map::with_capacity(entries.len());
                let mut sources = Vec::with_capacity(entries.len());
                for (key, mut child) in entries {
                    let (path_key, target) = self.map_key(&key, ctx);
                    check_collision(&out, &sources, &target, &key, ctx)?;
                    self.check_reversible(&key, &target, ctx)?;
                    ctx.enter(path_key.as_ref())?;
                    self.visit_mut(&mut child, ctx)?;
                    ctx.leave();
                    out.insert(target.into_owned(), child);
                    sources.push(key);
                }
                *map = out;
            }
            Value::Array(items) => self.visit_items_mut(items, ctx)?,
            Value::Set(items) => {
                self.visit_items_mut(items, ctx)?;
                if ctx.is_serializing() {
                    *value = Value::Array(std::mem::take(items));
                }
            }
            _ => {
                if let Some(encoded) = self.encode_leaf(value, ctx)? {
                    *value = encoded;
                }
            }
        }
        Ok(())
    }

    fn descend_copy(&self, value: &Value, ctx: &mut SerDesContext<'_>) -> Result<Value, Error> {
        match value {
            Value::Map(map) => {
                if let Some(decoded) = self.decode_tagged(map, ctx)? {
                    return Ok(decoded);
                }
                let renames = self.renames_keys(ctx);
                let mut out = Map::with_capacity(map.len());
                let mut sources: Vec<String> = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let (path_key, target) = if renames {
                        self.map_key(key, ctx)
                    } else {
                        (Cow::Borrowed(key.as_str()), Cow::Borrowed(key.as_str()))
                    };
                    if renames {
                        check_collision(&out, &sources, &target, key, ctx)?;
                        self.check_reversible(key, &target, ctx)?;
                    }
                    ctx.enter(path_key.as_ref())?;
                    let visited = self.visit_copy(child, ctx)?;
                    ctx.leave();
                    out.insert(target.into_owned(), visited);
                    sources.push(key.clone());
                }
                Ok(Value::Map(out))
            }
            Value::Array(items) => Ok(Value::Array(self.visit_items_copy(items, ctx)?)),
            Value::Set(items) => {
                let items = self.visit_items_copy(items, ctx)?;
                Ok(if ctx.is_serializing() {
                    Value::Array(items)
                } else {
                    Value::Set(items)
                })
            }
            leaf => Ok(self.encode_leaf(leaf, ctx)?.unwrap_or_else(|| leaf.clone())),
        }
    }

    fn visit_items_mut(
        &self,
        items: &mut [Value],
        ctx: &mut SerDesContext<'_>,
    ) -> Result<(), Error> {
        for (i, item) in items.iter_mut().enumerate() {
            ctx.enter(i)?;
            self.visit_mut(item, ctx)?;
            ctx.leave();
        }
        Ok(())
    }

    fn visit_items_copy(
        &self,
        items: &[Value],
        ctx: &mut SerDesContext<'_>,
    ) -> Result<Vec<Value>, Error> {
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            ctx.enter(i)?;
            out.push(self.visit_copy(item, ctx)?);
            ctx.leave();
        }
        Ok(out)
    }

    fn renames_keys(&self, ctx: &SerDesContext<'_>) -> bool {
        let keys = self.config.key_transformer();
        !keys.is_identity() && keys.applies_at(ctx.path())
    }

    /// The key to push on the path and the key to store, for one map entry.
    /// The path always names the application-side key.
    fn map_key<'k>(
        &self,
        key: &'k str,
        ctx: &SerDesContext<'_>,
    ) -> (Cow<'k, str>, Cow<'k, str>) {
        let keys = self.config.key_transformer();
        match ctx.direction() {
            Direction::Serialize => (Cow::Borrowed(key), keys.to_wire(key)),
            Direction::Deserialize => {
                let app = keys.from_wire(key);
                (app.clone(), app)
            }
        }
    }

    /// On serialize, a renamed key must read back as itself.
    fn check_reversible(&self, key: &str, wire: &str, ctx: &SerDesContext<'_>) -> Result<(), Error> {
        if !ctx.is_serializing() {
            return Ok(());
        }
        let back = self.config.key_transformer().from_wire(wire);
        if back.as_ref() == key {
            return Ok(());
        }
        Err(Error::IrreversibleKey {
            path: ctx.path().clone(),
            key: key.to_string(),
            wire: wire.to_string(),
            back: back.into_owned(),
        })
    }

    /// On deserialize, decode a tagged wire object into its rich scalar.
    fn decode_tagged(&self, map: &Map, ctx: &SerDesContext<'_>) -> Result<Option<Value>, Error> {
        if ctx.is_serializing() || map.len() != 1 {
            return Ok(None);
        }
        // The registry only needs to see the single entry.
        let Some((tag, payload)) = map.first() else {
            return Ok(None);
        };
        let Some(scalar) = self.config.scalars().by_tag(tag) else {
            return Ok(None);
        };
        scalar
            .from_wire(payload)
            .map(Some)
            .map_err(|e| Error::InvalidWireValue {
                path: ctx.path().clone(),
                message: e.to_string(),
            })
    }

    /// Default handling of a leaf. `None` means the leaf stays as it is.
    fn encode_leaf(&self, value: &Value, ctx: &SerDesContext<'_>) -> Result<Option<Value>, Error> {
        let kind = value.kind();
        let unsupported = |message: String| Error::UnsupportedValue {
            path: ctx.path().clone(),
            kind,
            message,
        };

        match ctx.direction() {
            Direction::Serialize => match value {
                Value::Float(f) if !f.is_finite() => {
                    Err(unsupported(format!("{} has no JSON form", f)))
                }
                Value::Custom(custom) => Err(unsupported(format!(
                    "no codec handles custom type '{}'",
                    custom.type_name()
                ))),
                _ if kind.is_rich_scalar() => match self.config.scalars().to_wire(value) {
                    Some(Ok(wire)) => Ok(Some(wire)),
                    Some(Err(e)) => Err(unsupported(e.to_string())),
                    None => Err(unsupported("no scalar type registered".to_string())),
                },
                _ => Ok(None),
            },
            Direction::Deserialize => {
                if !kind.is_number() {
                    return Ok(None);
                }
                let repr = ctx.number_repr();
                if repr == NumberRepr::Number
                    && matches!(kind, ValueKind::Integer | ValueKind::Float)
                {
                    return Ok(None);
                }
                repr.apply(value.clone())
                    .map(Some)
                    .map_err(|message| Error::InvalidWireValue {
                        path: ctx.path().clone(),
                        message,
                    })
            }
        }
    }
}

impl From<SerDesConfig> for SerDes {
    fn from(config: SerDesConfig) -> Self {
        SerDes::new(config)
    }
}

fn check_collision(
    out: &Map,
    sources: &[String],
    target: &str,
    source: &str,
    ctx: &SerDesContext<'_>,
) -> Result<(), Error> {
    match out.get_index_of(target) {
        Some(i) => Err(Error::KeyCollision {
            path: ctx.path().clone(),
            key: target.to_string(),
            first: sources.get(i).cloned().unwrap_or_default(),
            second: source.to_string(),
        }),
        None => Ok(()),
    }
}

/// The kind of the first value inside `value` that is not plain data.
fn first_unplain(value: &Value) -> ValueKind {
    match value {
        Value::Array(items) => items
            .iter()
            .find(|v| !v.is_plain())
            .map_or(ValueKind::Array, first_unplain),
        Value::Map(map) => map
            .values()
            .find(|v| !v.is_plain())
            .map_or(ValueKind::Map, first_unplain),
        other => other.kind(),
    }
}

fn aborted(direction: Direction, error: Error) -> Error {
    log::debug!("{:?} aborted: {}", direction, error);
    error
}
