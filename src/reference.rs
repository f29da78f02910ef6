//! Reference classification and rewriting
//!
//! Every `$ref` value met by the aggregators is classified once into a
//! [`Reference`]: a pure fragment of the current document, an absolute URI,
//! or a URI reference relative to the document it appears in.
//!
//! [`rewrite_references`] is the prefix-substitution sweep applied to a whole
//! document with an ordered list of [`RefMapping`]s: for each `$ref` value the
//! first mapping whose prefix matches wins, and only that prefix is replaced.

use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::pointer::escape;
use crate::schema::REF;

/// Classified `$ref` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `#...`: a location inside the current document.
    Fragment(String),
    /// A URI carrying its own scheme.
    Absolute(Url),
    /// A URI reference to resolve against the current document's URI.
    Relative(String),
}

impl Reference {
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with('#') {
            return Self::Fragment(raw.to_string());
        }
        match Url::parse(raw) {
            Ok(url) => Self::Absolute(url),
            Err(_) => Self::Relative(raw.to_string()),
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::Fragment(_))
    }

    /// Resolves the reference against `base`, the URI of the document holding it.
    ///
    /// Returns the target document URI, without fragment, and the fragment of
    /// the reference (empty when the reference targets the whole document).
    pub fn resolve(&self, base: &Url) -> Result<(Url, String)> {
        let mut target = match self {
            Self::Absolute(url) => url.clone(),
            Self::Fragment(raw) | Self::Relative(raw) => base.join(raw)?,
        };
        let fragment = target.fragment().unwrap_or_default().to_string();
        target.set_fragment(None);
        Ok((target, fragment))
    }
}

/// Prefix substitution applied to `$ref` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMapping {
    pub match_prefix: String,
    pub replacement_prefix: String,
}

impl RefMapping {
    pub fn new(match_prefix: impl Into<String>, replacement_prefix: impl Into<String>) -> Self {
        Self {
            match_prefix: match_prefix.into(),
            replacement_prefix: replacement_prefix.into(),
        }
    }

    pub fn matches(&self, reference: &str) -> bool {
        reference.starts_with(&self.match_prefix)
    }

    /// Replaces the matched prefix, keeping the remainder of `reference`.
    pub fn map(&self, reference: &str) -> Option<String> {
        reference
            .strip_prefix(&self.match_prefix)
            .map(|rest| format!("{}{}", self.replacement_prefix, rest))
    }
}

/// Maps `reference` with the first matching mapping.
pub fn map_reference(reference: &str, mappings: &[RefMapping]) -> Option<String> {
    mappings.iter().find_map(|mapping| mapping.map(reference))
}

/// Rewrites every `$ref` of `document` with the first matching mapping.
///
/// Returns the number of rewritten references.
pub fn rewrite_references(document: &mut Value, mappings: &[RefMapping]) -> usize {
    let mut rewritten = 0;
    for_each_reference_mut(document, &mut |reference| {
        if let Some(mapped) = map_reference(reference, mappings) {
            *reference = mapped;
            rewritten += 1;
        }
    });
    rewritten
}

/// Calls `f` on every string `$ref` value of `value`, depth-first, in
/// document order.
pub fn for_each_reference_mut<F>(value: &mut Value, f: &mut F)
where
    F: FnMut(&mut String),
{
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut(REF) {
                f(reference);
            }
            for (key, child) in map.iter_mut() {
                if key != REF {
                    for_each_reference_mut(child, f);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                for_each_reference_mut(item, f);
            }
        }
        _ => {}
    }
}

/// Lists every string `$ref` of `value` as (JSON Pointer of the holding
/// object, reference), in document order.
pub fn reference_holders(value: &Value) -> Vec<(String, String)> {
    let mut holders = Vec::new();
    collect_holders(value, &mut String::new(), &mut holders);
    holders
}

fn collect_holders(value: &Value, path: &mut String, holders: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get(REF) {
                holders.push((path.clone(), reference.clone()));
            }
            for (key, child) in map {
                let len = path.len();
                path.push('/');
                path.push_str(&escape(key));
                collect_holders(child, path, holders);
                path.truncate(len);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = path.len();
                path.push('/');
                path.push_str(&index.to_string());
                collect_holders(item, path, holders);
                path.truncate(len);
            }
        }
        _ => {}
    }
}
