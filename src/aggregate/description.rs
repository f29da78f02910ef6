//! # Stage 5: Global Values Description
//!
//! Appends to `properties.global.allOf` an annotation listing the direct
//! dependencies of the chart, as plain text for `description` and as HTML
//! with links to the published schemas for `x-intellij-html-description`.
//!
//! Annotations generated by an earlier aggregation of the same document are
//! recognised by their title and replaced, never accumulated.

use serde_json::{json, Value};

use crate::model::{mapping_for, Chart, RepositoryMappings};
use crate::schema::{
    global_all_of_mut, DESCRIPTION, GLOBAL_VALUES_DESCRIPTION, GLOBAL_VALUES_TITLE,
    HTML_DESCRIPTION, NEW_LINE, TITLE,
};

/// Builds the description of the global values of a chart.
pub struct GlobalDescriptionComposer<'a> {
    mappings: &'a RepositoryMappings,
}

impl<'a> GlobalDescriptionComposer<'a> {
    pub fn new(mappings: &'a RepositoryMappings) -> Self {
        Self { mappings }
    }

    /// Annotation describing the dependencies of `chart`.
    pub fn annotation(&self, chart: &Chart) -> Value {
        let labels: String = chart
            .dependencies
            .iter()
            .map(|dependency| format!("{}- {}", NEW_LINE, dependency.full_name()))
            .collect();
        let html_labels: String = chart
            .dependencies
            .iter()
            .map(|dependency| match mapping_for(self.mappings, dependency) {
                Some(mapping) => format!(
                    "<li><a href='{}'>{}</a></li>",
                    mapping.chart_uri(dependency),
                    dependency.full_name()
                ),
                None => format!("<li>{}</li>", dependency.full_name()),
            })
            .collect();
        json!({
            TITLE: format!("{} {}", GLOBAL_VALUES_TITLE, chart.label()),
            DESCRIPTION: format!("{} {}: {}", NEW_LINE, GLOBAL_VALUES_DESCRIPTION, labels),
            HTML_DESCRIPTION: format!("<br>{}: <ul>{}</ul>", GLOBAL_VALUES_DESCRIPTION, html_labels),
        })
    }

    /// Removes previously generated annotations from the global values of
    /// `document`. Returns the number of removed annotations.
    pub fn remove_generated(document: &mut Value) -> usize {
        let Some(all_of) = document
            .pointer_mut("/properties/global/allOf")
            .and_then(Value::as_array_mut)
        else {
            return 0;
        };
        let before = all_of.len();
        all_of.retain(|entry| !is_generated(entry));
        before - all_of.len()
    }

    /// Replaces the annotation of `document` by a fresh one for `chart`.
    pub fn compose(&self, document: &mut Value, chart: &Chart) {
        Self::remove_generated(document);
        if let Some(root) = document.as_object_mut() {
            global_all_of_mut(root).push(self.annotation(chart));
        }
    }
}

fn is_generated(entry: &Value) -> bool {
    entry
        .get(TITLE)
        .and_then(Value::as_str)
        .is_some_and(|title| title.starts_with(GLOBAL_VALUES_TITLE))
}
