//! Memoization of embedded fragments
//!
//! The registry maps the identity of every embedded source to the pointer it
//! was embedded at. Aggregators register a source *before* following its
//! references, which both breaks reference cycles and guarantees that a
//! source reached from several places is embedded exactly once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::pointer::Pointer;

/// Resolved identity of an embedded source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceIdentity {
    /// Fragment obtained from a schema repository.
    Uri(String),
    /// Fragment of the extraction tree, by path relative to its root.
    Extracted(PathBuf),
    /// Any other file: sibling aggregated documents, the chart's own schema.
    File(PathBuf),
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => f.write_str(uri),
            Self::Extracted(path) => write!(f, "extracted:{}", path.display()),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Sources embedded so far during one aggregation, with their pointers.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedFragmentRegistry {
    entries: BTreeMap<SourceIdentity, Pointer>,
}

impl EmbeddedFragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &SourceIdentity) -> Option<&Pointer> {
        self.entries.get(source)
    }

    pub fn contains(&self, source: &SourceIdentity) -> bool {
        self.entries.contains_key(source)
    }

    /// Records `source` at `pointer`.
    ///
    /// The first registration of a source is kept; returns `false` when the
    /// source was already registered.
    pub fn register(&mut self, source: SourceIdentity, pointer: Pointer) -> bool {
        if self.entries.contains_key(&source) {
            return false;
        }
        self.entries.insert(source, pointer);
        true
    }

    /// Source already embedded at `pointer`, if any.
    pub fn owner_of(&self, pointer: &Pointer) -> Option<&SourceIdentity> {
        self.entries
            .iter()
            .find(|(_, registered)| *registered == pointer)
            .map(|(source, _)| source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceIdentity, &Pointer)> {
        self.entries.iter()
    }
}
