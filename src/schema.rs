//! JSON schema keywords, file names and helpers for the few well-known
//! locations of a values schema (`properties`, `properties.global.allOf`,
//! strictness flags).

use serde_json::{json, Map, Value};

/// JSON schema dialect of generated documents.
pub const SCHEMA_VERSION: &str = "https://json-schema.org/draft/2020-12/schema";

pub const SCHEMA: &str = "$schema";
pub const ID: &str = "$id";
pub const REF: &str = "$ref";
pub const DEFS: &str = "$defs";
/// Marker left in a placeholder fragment when its source could not be read.
pub const ERROR: &str = "$error";
/// Annotation recording a reference removed by the integrity repair.
pub const COMMENT: &str = "_comment";
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const HTML_DESCRIPTION: &str = "x-intellij-html-description";
pub const GENERATED_BY: &str = "x-generated-by";
pub const TYPE: &str = "type";
pub const PROPERTIES: &str = "properties";
pub const ALL_OF: &str = "allOf";
pub const GLOBAL: &str = "global";
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const UNEVALUATED_PROPERTIES: &str = "unevaluatedProperties";

/// Sub-namespaces of `$defs` in an aggregated document.
pub const DOWNLOADED: &str = "downloaded";
pub const EXTRACTED: &str = "extracted";
pub const LOCAL: &str = "local";

pub const VALUES_SCHEMA_FILE: &str = "values.schema.json";
pub const AGGREGATED_SCHEMA_FILE: &str = "aggregated-values.schema.json";
/// Separate global values document published by early schema generators.
///
/// Only referenced to strip legacy references to it.
pub const GLOBAL_VALUES_SCHEMA_FILE: &str = "global-values.schema.json";
pub const PATCH_VALUES_SCHEMA_FILE: &str = "values.schema.patch.json";
pub const PATCH_VALUES_SCHEMA_YAML_FILE: &str = "values.schema.patch.yaml";
pub const PATCH_AGGREGATED_SCHEMA_FILE: &str = "aggregated-values.schema.patch.json";
pub const PATCH_AGGREGATED_SCHEMA_YAML_FILE: &str = "aggregated-values.schema.patch.yaml";

pub const DEFAULT_ID_BASE_URI: &str = "https://helm-values.fstaudt.github.io";
pub const GENERATOR_LABEL: &str = concat!("helm-values ", env!("CARGO_PKG_VERSION"));

/// Line separator understood both by plain-text and IDE markdown renderers.
pub const NEW_LINE: &str = "\n\\n";
pub const GLOBAL_VALUES_TITLE: &str = "Global values for chart";
pub const GLOBAL_VALUES_DESCRIPTION: &str = "Global values of dependencies";
pub const EXTRACTED_GLOBAL_VALUES_TITLE: &str = "Aggregated global values for";

/// Returns `node[key]` as an object, inserting an empty object when the key
/// is absent or holds something else.
pub fn object_entry<'a>(node: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = node
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut().expect("entry holds an object")
}

/// Returns `node[key]` as an array, inserting an empty array when the key is
/// absent or holds something else.
pub fn array_entry<'a>(node: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let entry = node
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    entry.as_array_mut().expect("entry holds an array")
}

/// `properties` of a schema node, created on demand.
pub fn properties_mut(node: &mut Map<String, Value>) -> &mut Map<String, Value> {
    object_entry(node, PROPERTIES)
}

/// `properties.global.allOf` of a schema node, created on demand.
pub fn global_all_of_mut(node: &mut Map<String, Value>) -> &mut Vec<Value> {
    array_entry(object_entry(properties_mut(node), GLOBAL), ALL_OF)
}

/// `properties.global` of a schema node, if declared.
pub fn global_of(node: &Map<String, Value>) -> Option<&Map<String, Value>> {
    node.get(PROPERTIES)?.get(GLOBAL)?.as_object()
}

/// Removes the strictness flags of an embedded fragment.
///
/// Flags are removed from the fragment root and from its global values, the
/// two places where they would otherwise constrain the merged parent.
pub fn strip_strictness(schema: &mut Map<String, Value>) {
    schema.shift_remove(ADDITIONAL_PROPERTIES);
    schema.shift_remove(UNEVALUATED_PROPERTIES);
    if let Some(global) = schema
        .get_mut(PROPERTIES)
        .and_then(|properties| properties.get_mut(GLOBAL))
        .and_then(Value::as_object_mut)
    {
        global.shift_remove(ADDITIONAL_PROPERTIES);
        global.shift_remove(UNEVALUATED_PROPERTIES);
    }
}

/// Fragment embedded in place of a source that could not be read or parsed.
pub fn placeholder(cause: &str) -> Value {
    json!({ TYPE: "object", ERROR: cause })
}

/// `{ "$ref": reference }`
pub fn reference_node(reference: impl Into<String>) -> Value {
    let mut node = Map::new();
    node.insert(REF.to_string(), Value::String(reference.into()));
    Value::Object(node)
}

/// Appends `value` unless an equal entry is already present.
///
/// Returns `true` when the value was appended.
pub fn push_unique(sequence: &mut Vec<Value>, value: Value) -> bool {
    if sequence.contains(&value) {
        return false;
    }
    sequence.push(value);
    true
}
