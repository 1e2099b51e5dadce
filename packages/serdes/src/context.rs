//! Per-traversal state handed to codecs.

use docwire_core::{Path, Segment};

use crate::config::SerDesConfig;
use crate::error::Error;
use crate::keys::KeyTransformer;
use crate::numbers::NumberRepr;

/// Which way a traversal runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Application document to wire.
    Serialize,
    /// Wire to application document.
    Deserialize,
}

/// The state of one traversal: where it is and how it was configured.
///
/// A context lives for exactly one `serialize` or `deserialize` call and is
/// never shared between calls. Its path always names keys as the
/// application sees them.
#[derive(Debug)]
pub struct SerDesContext<'c> {
    config: &'c SerDesConfig,
    direction: Direction,
    in_place: bool,
    path: Path,
}

impl<'c> SerDesContext<'c> {
    pub(crate) fn new(config: &'c SerDesConfig, direction: Direction, in_place: bool) -> Self {
        SerDesContext {
            config,
            direction,
            in_place,
            path: Path::root(),
        }
    }

    /// Path of the node being visited.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_serializing(&self) -> bool {
        self.direction == Direction::Serialize
    }

    /// Whether this traversal rewrites the caller's tree.
    pub fn mutating_in_place(&self) -> bool {
        self.in_place
    }

    /// The number representation chosen for the current path.
    pub fn number_repr(&self) -> NumberRepr {
        self.config.numbers().resolve(&self.path)
    }

    pub fn key_transformer(&self) -> &dyn KeyTransformer {
        self.config.key_transformer()
    }

    pub fn config(&self) -> &SerDesConfig {
        self.config
    }

    /// Step into a child node.
    pub(crate) fn enter(&mut self, segment: impl Into<Segment>) -> Result<(), Error> {
        self.path.push(segment);
        if self.path.len() > self.config.max_depth() {
            return Err(Error::MalformedDocument {
                path: self.path.clone(),
                message: format!("nesting exceeds {} levels", self.config.max_depth()),
            });
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbers::NumberPolicy;
    use docwire_core::pattern;

    #[test]
    fn enter_and_leave_track_the_path() {
        let config = SerDesConfig::default();
        let mut ctx = SerDesContext::new(&config, Direction::Serialize, false);
        ctx.enter("cars").unwrap();
        ctx.enter(0usize).unwrap();
        assert_eq!(ctx.path().to_string(), "cars.0");
        ctx.leave();
        ctx.leave();
        assert!(ctx.path().is_empty());
        assert!(ctx.is_serializing());
        assert!(!ctx.mutating_in_place());
    }

    #[test]
    fn depth_limit_is_malformed() {
        let config = SerDesConfig::builder().max_depth(2).build();
        let mut ctx = SerDesContext::new(&config, Direction::Deserialize, true);
        ctx.enter("a").unwrap();
        ctx.enter("b").unwrap();
        let err = ctx.enter("c").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { ref path, .. } if path.to_string() == "a.b.c"));
    }

    #[test]
    fn number_repr_follows_the_path() {
        let config = SerDesConfig::builder()
            .numbers(NumberPolicy::per_path(NumberRepr::Number).with(pattern!("id"), NumberRepr::BigInt))
            .build();
        let mut ctx = SerDesContext::new(&config, Direction::Deserialize, false);
        assert_eq!(ctx.number_repr(), NumberRepr::Number);
        ctx.enter("id").unwrap();
        assert_eq!(ctx.number_repr(), NumberRepr::BigInt);
    }
}
