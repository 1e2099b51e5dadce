//! The ordered codec collection consulted at every node.

use std::fmt;
use std::sync::Arc;

use docwire_core::{Path, Value};

use crate::codec::{Codec, PriorityClass};

/// Codecs in registration order, bucketed by priority class.
///
/// Registration order is the only tie-break inside a class. Registering the
/// same rule twice keeps both codecs; both are tried.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn Codec>>,
    // Indices into `codecs`, one list per priority class.
    by_class: [Vec<usize>; 3],
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a codec.
    pub fn register(&mut self, codec: impl Codec + 'static) {
        self.register_shared(Arc::new(codec));
    }

    /// Append a codec that is shared with other registries.
    pub fn register_shared(&mut self, codec: Arc<dyn Codec>) {
        let slot = class_slot(codec.rule().class());
        self.by_class[slot].push(self.codecs.len());
        self.codecs.push(codec);
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// All codecs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Codec> {
        self.codecs.iter().map(|c| c.as_ref())
    }

    /// Shared handles to all codecs, in registration order.
    pub fn iter_shared(&self) -> impl Iterator<Item = Arc<dyn Codec>> + '_ {
        self.codecs.iter().cloned()
    }

    /// All codecs in the order the engine tries them: path class, type
    /// class, wildcard class, registration order within each.
    pub fn in_priority_order(&self) -> impl Iterator<Item = &dyn Codec> {
        self.by_class
            .iter()
            .flatten()
            .map(move |&i| self.codecs[i].as_ref())
    }

    /// The codecs whose rule matches `value` at `path`, in priority order.
    ///
    /// During a traversal the engine re-checks type rules against the
    /// current value as it goes, since a `Continue` may change its type.
    pub fn matching<'r>(&'r self, path: &'r Path, value: &'r Value) -> Vec<&'r dyn Codec> {
        self.in_priority_order()
            .filter(|c| c.rule().matches(path, value))
            .collect()
    }
}

fn class_slot(class: PriorityClass) -> usize {
    match class {
        PriorityClass::Path => 0,
        PriorityClass::Type => 1,
        PriorityClass::Wildcard => 2,
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name().to_string()))
            .finish()
    }
}

impl<C: Codec + 'static> FromIterator<C> for CodecRegistry {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut registry = CodecRegistry::new();
        for codec in iter {
            registry.register(codec);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FnCodec;
    use docwire_core::{path, pattern, ValueKind};

    fn names(codecs: Vec<&dyn Codec>) -> Vec<String> {
        codecs.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn priority_is_path_then_type_then_wildcard() {
        let registry: CodecRegistry = [
            FnCodec::for_root().named("root"),
            FnCodec::for_kind(ValueKind::Integer).named("int"),
            FnCodec::for_path(pattern!("a")).named("a"),
            FnCodec::for_any().named("any"),
        ]
        .into_iter()
        .collect();

        let value = Value::Integer(1);
        assert_eq!(names(registry.matching(&path!("a"), &value)), ["a", "int", "any"]);
        assert_eq!(
            names(registry.matching(&Path::root(), &value)),
            ["int", "root", "any"]
        );
    }

    #[test]
    fn registration_order_breaks_ties_and_duplicates_are_kept() {
        let registry: CodecRegistry = [
            FnCodec::for_path(pattern!("a")).named("first"),
            FnCodec::for_name("a").named("by-name"),
            FnCodec::for_path(pattern!("a")).named("second"),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            names(registry.matching(&path!("a"), &Value::Null)),
            ["first", "by-name", "second"]
        );
    }

    #[test]
    fn type_rules_follow_the_value() {
        let mut registry = CodecRegistry::new();
        registry.register(FnCodec::for_kind(ValueKind::String).named("str"));

        assert_eq!(names(registry.matching(&path!("x"), &Value::from("s"))), ["str"]);
        assert!(registry.matching(&path!("x"), &Value::Null).is_empty());
    }

    #[test]
    fn iter_keeps_registration_order() {
        let registry: CodecRegistry = [
            FnCodec::for_any().named("w"),
            FnCodec::for_path(pattern!("p")).named("p"),
        ]
        .into_iter()
        .collect();

        let order: Vec<_> = registry.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(order, ["w", "p"]);
        assert_eq!(format!("{:?}", registry), r#"["w", "p"]"#);
    }

    #[test]
    fn shared_codecs_can_live_in_two_registries() {
        let shared: Arc<dyn Codec> = Arc::new(FnCodec::for_root().named("shared"));
        let mut a = CodecRegistry::new();
        let mut b = CodecRegistry::new();
        a.register_shared(Arc::clone(&shared));
        b.register_shared(shared);
        assert_eq!(a.len() + b.len(), 2);
    }
}
