//! Shared types for defspace
//!
//! This crate provides the small value types used across the defspace
//! ecosystem: source spans for definition files and the dotted names the
//! registry is keyed by.

use std::fmt;

/// Byte range in a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Dotted registry name: `space.definition`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub space: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(space: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            name: name.into(),
        }
    }

    /// Split `space.name` at the first dot. Returns `None` for bare names.
    pub fn parse(dotted: &str) -> Option<Self> {
        let (space, name) = dotted.split_once('.')?;
        if space.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(space, name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.space, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_roundtrip() {
        let name = QualifiedName::parse("defs.greet").unwrap();
        assert_eq!(name.space, "defs");
        assert_eq!(name.name, "greet");
        assert_eq!(name.to_string(), "defs.greet");
    }

    #[test]
    fn test_qualified_name_rejects_bare() {
        assert!(QualifiedName::parse("defs").is_none());
        assert!(QualifiedName::parse(".greet").is_none());
        assert!(QualifiedName::parse("defs.").is_none());
    }

    #[test]
    fn test_span_cover() {
        let a = Span::new(4, 8);
        let b = Span::new(1, 5);
        assert_eq!(a.to(b), Span::new(1, 8));
        assert_eq!(a.len(), 4);
    }
}
