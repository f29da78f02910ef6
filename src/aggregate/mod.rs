//! Implementation of the stages of the aggregation pipeline.
//!
//! ## Overview
//!
//! Aggregation turns the values schema of a chart into one self-contained
//! document. The stages run in this order:
//!
//! 1. Remote references - Rewrite references to published schemas, then embed
//!    them under `$defs/downloaded` ([`downloaded`])
//! 2. Extracted tree - Embed the schemas of packaged dependencies under
//!    `$defs/extracted` and link them into `properties` ([`extracted`])
//! 3. Local references - Rewrite references to sibling charts, then embed
//!    their aggregated documents under `$defs/local` ([`local`])
//! 4. Chart schema - Embed the chart's own hand-written schema ([`local`])
//! 5. Description - Summarise dependencies in the global values ([`description`])
//! 6. Repair - Neutralize every reference that does not resolve ([`repair`])
//!
//! The optional patches surround these stages, see [`orchestrator`].
//!
//! Every stage embeds fragments the same way: fragment references are rebased
//! on the embedding pointer and strictness flags are stripped, so that the
//! fragment keeps its meaning inside the merged document without
//! constraining it.

use log::warn;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pointer::Pointer;
use crate::reference::{rewrite_references, RefMapping};
use crate::schema::{placeholder, strip_strictness, DEFS};
use crate::source::FetchError;

// Stage modules
pub mod description;
pub mod downloaded;
pub mod extracted;
pub mod local;
pub mod orchestrator;
pub mod repair;

pub use description::GlobalDescriptionComposer;
pub use downloaded::DownloadedFragmentAggregator;
pub use extracted::ExtractedFragmentAggregator;
pub use local::LocalFragmentAggregator;
pub use orchestrator::{Aggregator, MergedDocument};
pub use repair::remove_invalid_references;

/// `#/$defs/<namespace>`
pub fn defs_pointer(namespace: &str) -> Pointer {
    Pointer::from_segments([DEFS, namespace])
}

/// Rewrites the fragment references of `fragment` (`#...`) relative to the
/// pointer it is embedded at.
pub fn rebase_fragment_references(fragment: &mut Value, at: &Pointer) -> usize {
    rewrite_references(fragment, &[RefMapping::new("#", at.to_fragment())])
}

/// Parses fetched bytes as a schema document.
///
/// # Errors
///
/// `Error::Fetch` when the content could not be obtained, `Error::Schema`
/// when it is not a JSON object.
pub fn read_fragment(
    content: std::result::Result<Vec<u8>, FetchError>,
    location: &str,
) -> Result<Value> {
    let bytes = content?;
    let fragment: Value = serde_json::from_slice(&bytes).map_err(|e| Error::Schema {
        location: location.to_string(),
        message: e.to_string(),
    })?;
    if !fragment.is_object() {
        return Err(Error::Schema {
            location: location.to_string(),
            message: "expected a JSON object".to_string(),
        });
    }
    Ok(fragment)
}

/// Like [`read_fragment`], degrading any failure into a placeholder fragment
/// carrying the failure in `$error`.
pub fn fragment_or_placeholder(
    content: std::result::Result<Vec<u8>, FetchError>,
    location: &str,
) -> Value {
    match read_fragment(content, location) {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!("Failed to load schema {}: {}", location, e);
            placeholder(&e.to_string())
        }
    }
}

/// Copies the content of `fragment` into the object at `at`, without its
/// strictness flags.
pub fn embed(document: &mut Value, at: &Pointer, fragment: Value) -> Result<()> {
    let Value::Object(mut fragment) = fragment else {
        return Err(Error::Schema {
            location: at.to_fragment(),
            message: "expected a JSON object".to_string(),
        });
    };
    strip_strictness(&mut fragment);
    at.object_mut(document)?.extend(fragment);
    Ok(())
}
