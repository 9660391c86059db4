//! Breadcrumbs through the instance tree.
//!
//! A [`Path`] is a persistent linked list: `push` allocates one node pointing at
//! its parent, so siblings share their common prefix and never see each
//! other's segments.
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// Form used in error context: `'key'` or `index 3`.
    pub fn describe(&self) -> String {
        match self {
            Segment::Key(key) => format!("'{key}'"),
            Segment::Index(index) => format!("index {index}"),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

#[derive(Debug)]
struct Node {
    segment: Segment,
    parent: Option<Arc<Node>>,
}

#[derive(Debug, Clone, Default)]
pub struct Path {
    tail: Option<Arc<Node>>,
    len: usize,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the extended path; `self` is left as it was.
    pub fn push(&self, segment: impl Into<Segment>) -> Path {
        Path {
            tail: Some(Arc::new(Node { segment: segment.into(), parent: self.tail.clone() })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<&Segment> {
        self.tail.as_deref().map(|node| &node.segment)
    }

    /// Segments from the root downwards.
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.tail.as_deref();
        while let Some(node) = cursor {
            out.push(node.segment.clone());
            cursor = node.parent.as_deref();
        }
        out.reverse();
        out
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.segments().iter().map(Segment::to_string).collect()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.segments() == other.segments()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.to_strings().join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_never_touches_siblings() {
        let root = Path::root();
        let mango = root.push("mango");
        let first = mango.push(0usize);
        let second = mango.push(1usize).push("jupiter");

        assert_eq!(root.to_string(), "/");
        assert_eq!(mango.to_string(), "/mango");
        assert_eq!(first.to_string(), "/mango/0");
        assert_eq!(second.to_string(), "/mango/1/jupiter");
        assert_eq!(first.len(), 2);
        assert_eq!(second.last(), Some(&Segment::Key("jupiter".into())));
    }

    #[test]
    fn segments_are_root_first() {
        let path = Path::root().push("a").push(3usize);
        assert_eq!(path.segments(), vec![Segment::Key("a".into()), Segment::Index(3)]);
        assert_eq!(path.to_strings(), ["a", "3"]);
        assert_eq!(path, Path::root().push("a").push(3usize));
    }
}
