//! Property-based tests for `$ref` rewriting and pointer rendering.
//!
//! These tests use proptest to generate random references and documents and
//! verify that the rewriting invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::pointer::Pointer;
    use crate::reference::{map_reference, rewrite_references, RefMapping};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    // ============================================================================
    // RefMapping property tests
    // ============================================================================

    proptest! {
        /// Property: a mapped reference keeps everything after the matched prefix
        #[test]
        fn mapping_preserves_suffix(
            prefix in "https://[a-z]{1,10}\\.example\\.com/[a-z]{0,10}",
            replacement in "#/\\$defs/[a-z]{1,10}/",
            suffix in "[a-zA-Z0-9/._#-]{0,30}",
        ) {
            let mapping = RefMapping::new(prefix.clone(), replacement.clone());
            let reference = format!("{}{}", prefix, suffix);
            prop_assert_eq!(mapping.map(&reference), Some(format!("{}{}", replacement, suffix)));
        }

        /// Property: references not starting with the prefix are never mapped
        #[test]
        fn mapping_ignores_other_references(
            reference in "[a-z][a-z0-9/.]{0,30}",
            replacement in "#/\\$defs/[a-z]{1,10}/",
        ) {
            let mapping = RefMapping::new("#/", replacement);
            prop_assert!(!mapping.matches(&reference));
            prop_assert_eq!(mapping.map(&reference), None);
        }

        /// Property: with overlapping mappings, the first listed one applies
        #[test]
        fn first_matching_mapping_wins(
            prefix in "[a-z]{1,10}/",
            suffix in "[a-z]{0,10}",
            first in "#/[a-z]{1,5}/",
            second in "#/[A-Z]{1,5}/",
        ) {
            let mappings = vec![
                RefMapping::new(prefix.clone(), first.clone()),
                RefMapping::new(prefix.clone(), second),
            ];
            let mapped = map_reference(&format!("{}{}", prefix, suffix), &mappings);
            prop_assert_eq!(mapped, Some(format!("{}{}", first, suffix)));
        }
    }

    // ============================================================================
    // rewrite_references property tests
    // ============================================================================

    fn document_with_references(references: &[(String, String)]) -> Value {
        let properties: Map<String, Value> = references
            .iter()
            .map(|(key, reference)| (key.clone(), json!({ "$ref": reference })))
            .collect();
        json!({ "properties": properties })
    }

    proptest! {
        /// Property: every matching reference is rewritten, and counted once
        #[test]
        fn rewrite_counts_matching_references(
            suffixes in prop::collection::btree_map("[a-z]{1,8}", "[a-z/]{0,8}", 0..10),
        ) {
            let references: Vec<(String, String)> = suffixes
                .iter()
                .map(|(key, suffix)| (key.clone(), format!("https://charts.example.com/{}", suffix)))
                .collect();
            let mut document = document_with_references(&references);
            let mappings = [RefMapping::new("https://charts.example.com/", "#/$defs/downloaded/")];

            let rewritten = rewrite_references(&mut document, &mappings);
            prop_assert_eq!(rewritten, references.len());
            for (key, suffix) in &suffixes {
                let expected = format!("#/$defs/downloaded/{}", suffix);
                prop_assert_eq!(
                    document["properties"][key.as_str()]["$ref"].as_str(),
                    Some(expected.as_str())
                );
            }
        }

        /// Property: a document without matching references is left untouched
        #[test]
        fn rewrite_without_match_is_identity(
            suffixes in prop::collection::btree_map("[a-z]{1,8}", "[a-z/]{0,8}", 0..10),
        ) {
            let references: Vec<(String, String)> = suffixes
                .iter()
                .map(|(key, suffix)| (key.clone(), format!("#/{}", suffix)))
                .collect();
            let mut document = document_with_references(&references);
            let before = document.clone();
            let mappings = [RefMapping::new("https://", "#/$defs/downloaded/")];

            prop_assert_eq!(rewrite_references(&mut document, &mappings), 0);
            prop_assert_eq!(document, before);
        }
    }

    // ============================================================================
    // Pointer property tests
    // ============================================================================

    proptest! {
        /// Property: rendering a pointer as a fragment and parsing it back is lossless
        #[test]
        fn fragment_parses_back(segments in prop::collection::vec("[a-z~/%.]{0,8}", 0..5)) {
            let pointer = Pointer::from_segments(segments);
            prop_assert_eq!(Pointer::parse_fragment(&pointer.to_fragment()), Some(pointer));
        }

        /// Property: a pointer resolves the value it was used to set
        #[test]
        fn set_then_resolve(segments in prop::collection::vec("[a-z~/]{1,8}", 1..5)) {
            let pointer = Pointer::from_segments(segments);
            let mut document = json!({});
            pointer.set(&mut document, json!({ "type": "string" })).unwrap();
            prop_assert_eq!(pointer.resolve(&document), Some(&json!({ "type": "string" })));
        }
    }
}
