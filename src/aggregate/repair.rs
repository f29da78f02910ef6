//! # Stage 6: Reference Repair
//!
//! Once every fragment is embedded, a reference either points inside the
//! merged document or is broken (an unreachable remote schema, a typo in an
//! upstream schema, a pointer into a placeholder). Broken references are
//! removed and replaced by a `_comment` keeping their value, so that the
//! document stays usable without the constraint they carried.

use log::debug;
use serde_json::Value;

use crate::pointer::Pointer;
use crate::reference::reference_holders;
use crate::schema::{COMMENT, REF};

/// Whether `reference` is a fragment pointer resolving inside `document`.
pub fn resolves(document: &Value, reference: &str) -> bool {
    Pointer::parse_fragment(reference)
        .and_then(|pointer| pointer.resolve(document))
        .is_some()
}

/// Removes every reference of `document` that does not resolve inside it.
///
/// Returns the removed references, in document order.
pub fn remove_invalid_references(document: &mut Value) -> Vec<String> {
    let invalid: Vec<(String, String)> = reference_holders(document)
        .into_iter()
        .filter(|(_, reference)| !resolves(document, reference))
        .collect();

    let mut removed = Vec::new();
    for (holder, reference) in invalid {
        let Some(node) = document.pointer_mut(&holder).and_then(Value::as_object_mut) else {
            continue;
        };
        node.shift_remove(REF);
        node.insert(
            COMMENT.to_string(),
            Value::String(format!("removed invalid $ref {}", reference)),
        );
        debug!("Removed invalid $ref {} at #{}", reference, holder);
        removed.push(reference);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_references_are_kept() {
        let mut document = json!({
            "$defs": { "a/b": { "type": "string" }, "list": [{ "type": "integer" }] },
            "properties": {
                "x": { "$ref": "#/$defs/a~1b" },
                "y": { "$ref": "#/$defs/list/0" },
                "z": { "$ref": "#" }
            }
        });
        let before = document.clone();
        assert!(remove_invalid_references(&mut document).is_empty());
        assert_eq!(document, before);
    }

    #[test]
    fn test_invalid_references_are_replaced_by_comment() {
        let mut document = json!({
            "properties": {
                "missing": { "$ref": "#/$defs/missing", "description": "kept" },
                "remote": { "allOf": [{ "$ref": "https://charts.example.com/a.json" }] },
                "anchor": { "$ref": "#anchor" }
            }
        });
        let removed = remove_invalid_references(&mut document);
        assert_eq!(
            removed,
            vec!["#/$defs/missing", "https://charts.example.com/a.json", "#anchor"]
        );
        assert_eq!(
            document["properties"]["missing"],
            json!({ "description": "kept", "_comment": "removed invalid $ref #/$defs/missing" })
        );
        assert_eq!(
            document["properties"]["remote"]["allOf"][0],
            json!({ "_comment": "removed invalid $ref https://charts.example.com/a.json" })
        );
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut document = json!({ "properties": { "x": { "$ref": "#/nowhere" } } });
        remove_invalid_references(&mut document);
        let once = document.clone();
        assert!(remove_invalid_references(&mut document).is_empty());
        assert_eq!(document, once);
    }
}
