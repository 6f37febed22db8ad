//! Provenance tracking for profile items
//!
//! A derivation records where an item came from (`file:line`, an
//! environment import, a profile layer). It is carried along for
//! diagnostics and never takes part in merge decisions, except that a
//! squash of identical items refreshes it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ordered list of provenance entries.
///
/// The list is shared: cloning a derivation is cheap, so several items
/// built from the same source line can point at one allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Derivation(Arc<Vec<String>>);

impl Derivation {
    /// Create an empty derivation
    pub fn new() -> Self {
        Self::default()
    }

    /// Derivation with a single source
    pub fn from_source(source: impl Into<String>) -> Self {
        Self(Arc::new(vec![source.into()]))
    }

    /// Derivation pointing at a line in a file
    pub fn from_location(file: impl AsRef<str>, line: usize) -> Self {
        Self::from_source(format!("{}:{}", file.as_ref(), line))
    }

    /// Return a new derivation with `source` appended
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        let mut sources = self.0.as_ref().clone();
        sources.push(source.into());
        Self(Arc::new(sources))
    }

    /// Return a new derivation containing our sources followed by `other`'s
    pub fn join(&self, other: &Derivation) -> Self {
        let mut sources = self.0.as_ref().clone();
        sources.extend(other.0.iter().cloned());
        Self(Arc::new(sources))
    }

    /// Whether both derivations point at the same allocation, as the
    /// copies of one item do
    pub fn shares(&self, other: &Derivation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn sources(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<unknown>");
        }
        write!(f, "{}", self.0.join(", "))
    }
}

impl From<&str> for Derivation {
    fn from(source: &str) -> Self {
        Self::from_source(source)
    }
}

impl From<String> for Derivation {
    fn from(source: String) -> Self {
        Self::from_source(source)
    }
}
