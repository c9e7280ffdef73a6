//! Structural paths into a snapshot tree.

use serde_json::Value;
use std::fmt;

/// One step into a snapshot: a map key or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// True when this is the map key `name`.
    pub fn is_key(&self, name: &str) -> bool {
        matches!(self, PathSegment::Key(k) if k == name)
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Location of a node inside a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StructuralPath(Vec<PathSegment>);

impl StructuralPath {
    /// Empty path (the snapshot root).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extend with a map key.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// Extend with a sequence index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn first(&self) -> Option<&PathSegment> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Position of the first key segment `name` at or after `from`.
    pub fn position_of(&self, name: &str, from: usize) -> Option<usize> {
        self.0
            .iter()
            .skip(from)
            .position(|s| s.is_key(name))
            .map(|p| p + from)
    }

    /// Follow the first `len` segments through `root`.
    pub fn resolve_prefix<'a>(&self, root: &'a Value, len: usize) -> Option<&'a Value> {
        self.0.iter().take(len).try_fold(root, |node, segment| match segment {
            PathSegment::Key(k) => node.as_object()?.get(k),
            PathSegment::Index(i) => node.as_array()?.get(*i),
        })
    }

    /// Dotted rendering, e.g. `networks.0.interface.3.moniker`.
    pub fn dotted(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<Vec<PathSegment>> for StructuralPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}
