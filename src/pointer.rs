//! JSON Pointer addressing of nodes inside a schema document.
//!
//! A [`Pointer`] is a sequence of unescaped segments. It renders either as a
//! plain JSON Pointer (`/a/b`) for lookups with `serde_json`, or as a URI
//! fragment (`#/a/b`) for use inside `$ref` values.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Path to a node of a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer {
    segments: Vec<String>,
}

impl Pointer {
    /// Pointer to the document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses the fragment form of a pointer (`#`, `#/a/b`).
    ///
    /// Returns `None` for anything else, including plain-name fragments such
    /// as `#anchor`.
    pub fn parse_fragment(reference: &str) -> Option<Self> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(Self::root());
        }
        let rest = pointer.strip_prefix('/')?;
        Some(Self::from_segments(rest.split('/').map(unescape)))
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut joined = self.segments.clone();
        joined.extend(segments.into_iter().map(Into::into));
        Self { segments: joined }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Plain JSON Pointer (`/a/b`, empty for the root).
    pub fn to_json_pointer(&self) -> String {
        self.segments
            .iter()
            .map(|segment| format!("/{}", escape(segment)))
            .collect()
    }

    /// URI fragment form (`#/a/b`, `#` for the root).
    pub fn to_fragment(&self) -> String {
        format!("#{}", self.to_json_pointer())
    }

    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        document.pointer(&self.to_json_pointer())
    }

    /// Navigates to the object addressed by this pointer, creating missing
    /// intermediate objects.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pointer` if an existing node on the way is not an
    /// object (arrays are never created nor traversed here).
    pub fn object_mut<'a>(&self, document: &'a mut Value) -> Result<&'a mut Map<String, Value>> {
        let mut current = document;
        for (depth, segment) in self.segments.iter().enumerate() {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            let map = match current {
                Value::Object(map) => map,
                _ => return Err(self.type_error(depth)),
            };
            current = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => Ok(map),
            _ => Err(self.type_error(self.segments.len())),
        }
    }

    /// Stores `value` at this pointer, replacing whatever was there.
    pub fn set(&self, document: &mut Value, value: Value) -> Result<()> {
        match (self.parent(), self.segments.last()) {
            (Some(parent), Some(last)) => {
                parent.object_mut(document)?.insert(last.clone(), value);
            }
            _ => *document = value,
        }
        Ok(())
    }

    fn type_error(&self, depth: usize) -> Error {
        let reached = Self::from_segments(self.segments[..depth].iter().cloned());
        Error::Pointer {
            pointer: self.to_fragment(),
            message: format!("expected an object at {}", reached.to_fragment()),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fragment())
    }
}

/// Escapes a segment per RFC 6901 (`~` -> `~0`, `/` -> `~1`).
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
