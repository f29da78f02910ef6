//! # Stage 3: Sibling Chart Schemas
//!
//! Dependencies stored next to the chart (`repository: file://...`) already
//! have their own aggregated document. It is embedded whole at
//! `$defs/local/<name>/<file name>` and the references of the base document
//! to the sibling's values schema are rewritten to point at it.
//!
//! This stage also embeds the chart's own hand-written `values.schema.json`
//! at `$defs/local/<chart name>/values.schema.json`.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::Value;

use super::{defs_pointer, embed, fragment_or_placeholder, rebase_fragment_references};
use crate::model::{Chart, ChartDependency};
use crate::pointer::Pointer;
use crate::reference::RefMapping;
use crate::registry::{EmbeddedFragmentRegistry, SourceIdentity};
use crate::schema::{
    array_entry, push_unique, reference_node, ALL_OF, GLOBAL, GLOBAL_VALUES_SCHEMA_FILE, LOCAL,
    PROPERTIES, REF, VALUES_SCHEMA_FILE,
};
use crate::source::SchemaLocator;

/// Embeds the aggregated documents of locally stored dependencies.
pub struct LocalFragmentAggregator<'a> {
    locator: &'a dyn SchemaLocator,
    root: Pointer,
}

impl<'a> LocalFragmentAggregator<'a> {
    pub fn new(locator: &'a dyn SchemaLocator) -> Self {
        Self {
            locator,
            root: defs_pointer(LOCAL),
        }
    }

    /// Embedding pointer of the document at `path`, for `name`.
    pub fn pointer_for(&self, name: &str, path: &Path) -> Pointer {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.root.join([name.to_string(), file_name])
    }

    /// Mappings rewriting the references of the base document to the values
    /// schema of sibling charts (`../../<name>/<version>/values.schema.json`)
    /// into references to their embedded aggregated documents.
    pub fn ref_mappings(&self, chart: &Chart) -> Vec<RefMapping> {
        local_dependencies(chart)
            .map(|dependency| {
                let path = self.locator.aggregated_schema_for(dependency);
                RefMapping::new(
                    sibling_reference(dependency, VALUES_SCHEMA_FILE),
                    self.pointer_for(&dependency.name, &path).to_fragment(),
                )
            })
            .collect()
    }

    /// Embeds the aggregated document of every locally stored dependency.
    ///
    /// When two dependencies resolve to the same embedding pointer, the first
    /// one is kept and the other is logged and skipped.
    pub fn aggregate_dependencies(
        &self,
        document: &mut Value,
        chart: &Chart,
        registry: &mut EmbeddedFragmentRegistry,
    ) {
        for dependency in local_dependencies(chart) {
            let path = self.locator.aggregated_schema_for(dependency);
            let identity = SourceIdentity::File(path.clone());
            if registry.contains(&identity) {
                continue;
            }
            let pointer = self.pointer_for(&dependency.name, &path);
            if let Some(owner) = registry.owner_of(&pointer) {
                warn!(
                    "Skipping schema {} of dependency {}: {} is already embedded at {}",
                    path.display(),
                    dependency.full_name(),
                    owner,
                    pointer
                );
                continue;
            }
            registry.register(identity, pointer.clone());

            let location = path.display().to_string();
            let fragment = fragment_or_placeholder(self.locator.load(&path), &location);
            embed_rebased(document, &pointer, fragment, &location);
        }
    }

    /// Embeds the chart's own values schema and references it from the root
    /// `allOf`.
    pub fn embed_chart_schema(
        &self,
        document: &mut Value,
        chart: &Chart,
        origin: &Path,
        content: &[u8],
        registry: &mut EmbeddedFragmentRegistry,
    ) {
        let pointer = self.root.join([chart.name.as_str(), VALUES_SCHEMA_FILE]);
        if !registry.register(SourceIdentity::File(origin.to_path_buf()), pointer.clone()) {
            return;
        }
        let location = origin.display().to_string();
        let fragment = fragment_or_placeholder(Ok(content.to_vec()), &location);
        embed_rebased(document, &pointer, fragment, &location);
        if let Some(root) = document.as_object_mut() {
            push_unique(
                array_entry(root, ALL_OF),
                reference_node(pointer.to_fragment()),
            );
        }
    }
}

/// Removes the references of the global values to the separate global values
/// document of sibling charts, now carried by their embedded documents.
pub fn remove_legacy_global_references(document: &mut Value, chart: &Chart) -> usize {
    let legacy: Vec<String> = local_dependencies(chart)
        .map(|dependency| sibling_reference(dependency, GLOBAL_VALUES_SCHEMA_FILE))
        .collect();
    let Some(all_of) = document
        .pointer_mut(&format!("/{}/{}/{}", PROPERTIES, GLOBAL, ALL_OF))
        .and_then(Value::as_array_mut)
    else {
        return 0;
    };
    let before = all_of.len();
    all_of.retain(|entry| {
        entry
            .get(REF)
            .and_then(Value::as_str)
            .map_or(true, |reference| !legacy.iter().any(|l| l == reference))
    });
    before - all_of.len()
}

fn local_dependencies(chart: &Chart) -> impl Iterator<Item = &ChartDependency> {
    chart
        .dependencies
        .iter()
        .filter(|dependency| dependency.is_stored_locally())
}

/// `../../<name>/<sanitized version>/<file>`
fn sibling_reference(dependency: &ChartDependency, file: &str) -> String {
    format!(
        "../../{}/{}/{}",
        dependency.name,
        dependency.sanitized_version(),
        file
    )
}

fn embed_rebased(document: &mut Value, pointer: &Pointer, mut fragment: Value, location: &str) {
    rebase_fragment_references(&mut fragment, pointer);
    match embed(document, pointer, fragment) {
        Ok(()) => info!("Embedded {} at {}", location, pointer),
        Err(e) => warn!("Failed to embed schema {}: {}", location, e),
    }
}

/// Path of the chart's own values schema in `chart_dir`.
pub fn chart_schema_path(chart_dir: &Path) -> PathBuf {
    chart_dir.join(VALUES_SCHEMA_FILE)
}
