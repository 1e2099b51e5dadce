//! Document paths: where a value lives inside a document tree.
//!
//! A [`Path`] is a concrete location (`cars.0.pastOwners`), built up and torn
//! down while a traversal descends. A [`PathPattern`] is what codecs and number
//! policies are keyed by; it may contain `*` segments matching any single key or
//! index.
//!
//! Both use the same dotted text form. A literal `.` or `&` inside a key is
//! escaped with `&` (`a&.b` is the single key `a.b`).

use std::fmt;

/// Errors related to path parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A segment between two dots is empty.
    EmptySegment { position: usize },
    /// `&` followed by something other than `.`, `&` or `*`.
    InvalidEscape { position: usize, found: Option<char> },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::EmptySegment { position } => {
                write!(f, "empty path segment at position {}", position)
            }
            PathError::InvalidEscape { position, found } => match found {
                Some(c) => write!(f, "invalid escape '&{}' at byte {}", c, position),
                None => write!(f, "dangling '&' at byte {}", position),
            },
        }
    }
}

impl std::error::Error for PathError {}

/// One step of a path: a map key or a sequence index.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// Returns the key if this segment is a map key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    /// Returns the index if this segment is a sequence index.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(i) => Some(*i),
        }
    }

    /// Compare against the unescaped text form of a segment.
    ///
    /// Keys and indices are compared by text, so `"0"` matches both the key
    /// `"0"` and the index `0`.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            Segment::Key(k) => k == text,
            Segment::Index(i) => is_canonical_index(text) && text.parse::<usize>() == Ok(*i),
        }
    }

    fn from_text(text: String) -> Segment {
        if is_canonical_index(&text) {
            if let Ok(i) = text.parse::<usize>() {
                return Segment::Index(i);
            }
        }
        Segment::Key(text)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write_escaped(f, k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(k: &str) -> Self {
        Segment::Key(k.to_string())
    }
}

impl From<String> for Segment {
    fn from(k: String) -> Self {
        Segment::Key(k)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// A concrete location inside a document.
///
/// The empty path is the document root.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub segments: Vec<Segment>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path::default()
    }

    /// Parse a dotted path.
    ///
    /// All-digit segments without a leading zero become indices, everything
    /// else is a key.
    ///
    /// ```rust
    /// use docwire_core::{Path, Segment};
    ///
    /// let path = Path::parse("cars.0.pastOwners").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path[1], Segment::Index(0));
    ///
    /// let dotted = Path::parse("a&.b").unwrap();
    /// assert_eq!(dotted[0], Segment::Key("a.b".to_string()));
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let segments = split_raw(s)?
            .into_iter()
            .map(|(raw, _)| unescape(raw).map(Segment::from_text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Path { segments })
    }

    /// Build a path from segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        Path {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over segments.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Append a segment.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }

    /// Remove and return the last segment.
    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The last segment if it is a map key.
    pub fn last_key(&self) -> Option<&str> {
        self.last().and_then(Segment::as_key)
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Return a new path with one more segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<Segment>) -> Path {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix.segments == self.segments[..prefix.segments.len()]
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_empty() {
            None
        } else {
            Some(Path {
                segments: self.segments[..self.len() - 1].to_vec(),
            })
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Segment;

    fn index(&self, i: usize) -> &Self::Output {
        &self.segments[i]
    }
}

/// One segment of a [`PathPattern`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum PatternSegment {
    /// Matches a key or index with exactly this text.
    Exact(String),
    /// `*`: matches any single segment.
    Any,
}

impl PatternSegment {
    pub fn matches(&self, segment: &Segment) -> bool {
        match self {
            PatternSegment::Exact(text) => segment.matches_text(text),
            PatternSegment::Any => true,
        }
    }
}

impl From<&str> for PatternSegment {
    fn from(s: &str) -> Self {
        if s == "*" {
            PatternSegment::Any
        } else {
            PatternSegment::Exact(s.to_string())
        }
    }
}

impl From<usize> for PatternSegment {
    fn from(i: usize) -> Self {
        PatternSegment::Exact(i.to_string())
    }
}

/// A path with optional `*` wildcard segments.
///
/// A pattern matches a path of the same length whose segments match
/// pairwise. The empty pattern matches only the root.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct PathPattern {
    pub segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse a dotted pattern. A segment that is exactly `*` is a wildcard;
    /// `&*` is a literal `*` key.
    ///
    /// ```rust
    /// use docwire_core::{Path, PathPattern};
    ///
    /// let pattern = PathPattern::parse("cars.*.name").unwrap();
    /// assert!(pattern.matches(&Path::parse("cars.3.name").unwrap()));
    /// assert!(!pattern.matches(&Path::parse("cars.3").unwrap()));
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let segments = split_raw(s)?
            .into_iter()
            .map(|(raw, _)| {
                if raw == "*" {
                    Ok(PatternSegment::Any)
                } else {
                    unescape(raw).map(PatternSegment::Exact)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PathPattern { segments })
    }

    /// Build a pattern from segment texts; `"*"` is a wildcard.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PatternSegment>,
    {
        PathPattern {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check whether the pattern contains no wildcards.
    pub fn is_exact(&self) -> bool {
        self.wildcards() == 0
    }

    /// Number of `*` segments.
    pub fn wildcards(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PatternSegment::Any))
            .count()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.segments.len() == path.segments.len()
            && self
                .segments
                .iter()
                .zip(&path.segments)
                .all(|(p, s)| p.matches(s))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PatternSegment::Any => f.write_str("*")?,
                PatternSegment::Exact(text) if text == "*" => f.write_str("&*")?,
                PatternSegment::Exact(text) => write_escaped(f, text)?,
            }
        }
        Ok(())
    }
}

impl From<&Path> for PathPattern {
    fn from(path: &Path) -> Self {
        PathPattern {
            segments: path
                .iter()
                .map(|s| match s {
                    Segment::Key(k) => PatternSegment::Exact(k.clone()),
                    Segment::Index(i) => PatternSegment::Exact(i.to_string()),
                })
                .collect(),
        }
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use docwire_core::path;
///
/// let p = path!("users.123.name");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}

/// Macro for creating path patterns from literals.
#[macro_export]
macro_rules! pattern {
    ($s:expr) => {
        $crate::PathPattern::parse($s).expect("invalid path pattern literal")
    };
}

fn is_canonical_index(text: &str) -> bool {
    !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'))
}

/// Split on unescaped dots, returning raw (still escaped) segments and their
/// byte offsets.
fn split_raw(s: &str) -> Result<Vec<(&str, usize)>, PathError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut start = 0;
    let mut bytes = s.bytes().enumerate();
    while let Some((i, b)) = bytes.next() {
        match b {
            b'&' => {
                bytes.next();
            }
            b'.' => {
                if i == start {
                    return Err(PathError::EmptySegment { position: parts.len() });
                }
                parts.push((&s[start..i], start));
                start = i + 1;
            }
            _ => {}
        }
    }
    if start == s.len() {
        return Err(PathError::EmptySegment { position: parts.len() });
    }
    parts.push((&s[start..], start));
    Ok(parts)
}

fn unescape(raw: &str) -> Result<String, PathError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, e @ ('.' | '&' | '*'))) => out.push(e),
            other => {
                return Err(PathError::InvalidEscape {
                    position: i,
                    found: other.map(|(_, c)| c),
                })
            }
        }
    }
    Ok(out)
}

fn write_escaped(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    for c in key.chars() {
        if c == '.' || c == '&' {
            f.write_str("&")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_paths() {
        assert_eq!(Path::parse("").unwrap().len(), 0);
        assert_eq!(Path::parse("foo").unwrap().len(), 1);
        assert_eq!(Path::parse("foo.bar").unwrap().len(), 2);
        assert_eq!(Path::parse("foo.0.baz").unwrap().len(), 3);
    }

    #[test]
    fn digits_become_indices() {
        let p = path!("items.0.007.10");
        assert_eq!(p[1], Segment::Index(0));
        assert_eq!(p[2], Segment::Key("007".to_string()));
        assert_eq!(p[3], Segment::Index(10));
    }

    #[test]
    fn empty_segments_rejected() {
        assert_eq!(
            Path::parse("a..b"),
            Err(PathError::EmptySegment { position: 1 })
        );
        assert!(Path::parse(".a").is_err());
        assert!(Path::parse("a.").is_err());
    }

    #[test]
    fn escapes_roundtrip_through_display() {
        let p = Path::from_segments(["a.b", "c&d"]);
        assert_eq!(p.to_string(), "a&.b.c&&d");
        assert_eq!(Path::parse(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn invalid_escape_rejected() {
        let err = Path::parse("a&b").unwrap_err();
        assert!(err.to_string().contains("&b"));
        assert!(matches!(
            Path::parse("a&"),
            Err(PathError::InvalidEscape { found: None, .. })
        ));
    }

    #[test]
    fn push_and_pop_follow_stack_order() {
        let mut p = Path::root();
        p.push("cars");
        p.push(0usize);
        p.push("name");
        assert_eq!(p.to_string(), "cars.0.name");
        assert_eq!(p.pop(), Some(Segment::Key("name".to_string())));
        assert_eq!(p.pop(), Some(Segment::Index(0)));
        assert_eq!(p.to_string(), "cars");
    }

    #[test]
    fn has_prefix_works() {
        let p = path!("foo.bar.baz");
        assert!(p.has_prefix(&path!("")));
        assert!(p.has_prefix(&path!("foo")));
        assert!(p.has_prefix(&path!("foo.bar.baz")));
        assert!(!p.has_prefix(&path!("bar")));
        assert!(!p.has_prefix(&path!("foo.bar.baz.qux")));
    }

    #[test]
    fn strip_prefix_works() {
        let p = path!("foo.bar.baz");
        assert_eq!(p.strip_prefix(&path!("foo")), Some(path!("bar.baz")));
        assert_eq!(p.strip_prefix(&path!("other")), None);
    }

    #[test]
    fn parent_and_last_key() {
        let p = path!("a.0.b");
        assert_eq!(p.parent(), Some(path!("a.0")));
        assert_eq!(p.last_key(), Some("b"));
        assert_eq!(path!("a.0").last_key(), None);
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn segment_text_matching_ignores_key_vs_index() {
        assert!(Segment::Index(0).matches_text("0"));
        assert!(Segment::Key("0".to_string()).matches_text("0"));
        assert!(!Segment::Index(0).matches_text("00"));
        assert!(!Segment::Index(1).matches_text("0"));
    }

    #[test]
    fn pattern_matches_exact_and_wildcards() {
        let exact = pattern!("cars.0.pastOwners");
        assert!(exact.is_exact());
        assert!(exact.matches(&path!("cars.0.pastOwners")));
        assert!(!exact.matches(&path!("cars.1.pastOwners")));

        let wild = pattern!("cars.*.name");
        assert!(!wild.is_exact());
        assert_eq!(wild.wildcards(), 1);
        assert!(wild.matches(&path!("cars.1.name")));
        assert!(wild.matches(&Path::from_segments(vec![
            Segment::from("cars"),
            Segment::from("x"),
            Segment::from("name"),
        ])));
        assert!(!wild.matches(&path!("cars.1.name.first")));
    }

    #[test]
    fn empty_pattern_matches_only_root() {
        let root = PathPattern::default();
        assert!(root.matches(&Path::root()));
        assert!(!root.matches(&path!("a")));
    }

    #[test]
    fn escaped_star_is_literal() {
        let p = pattern!("a.&*");
        assert_eq!(p.segments[1], PatternSegment::Exact("*".to_string()));
        assert!(!p.matches(&path!("a.b")));
        assert_eq!(p.to_string(), "a.&*");
    }

    #[test]
    fn pattern_from_path() {
        let p = path!("a.2");
        let pattern = PathPattern::from(&p);
        assert!(pattern.matches(&p));
        assert_eq!(pattern.to_string(), "a.2");
    }

    #[test]
    fn path_error_is_error() {
        let err: Box<dyn std::error::Error> = Box::new(PathError::EmptySegment { position: 0 });
        assert!(err.to_string().contains("empty path segment"));
    }
}
