//! Orchestrator for the complete aggregation
//!
//! This module sequences the stages of [`crate::aggregate`] into the single
//! [`Aggregator::aggregate`] operation and wraps its result.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value;

use super::local::remove_legacy_global_references;
use super::{
    remove_invalid_references, DownloadedFragmentAggregator, ExtractedFragmentAggregator,
    GlobalDescriptionComposer, LocalFragmentAggregator,
};
use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;
use crate::generator::{generate_base_schema, values_title};
use crate::model::{Chart, RepositoryMappings};
use crate::patch::{apply_overlay, OverlayPatch, PatchStage};
use crate::reference::rewrite_references;
use crate::registry::EmbeddedFragmentRegistry;
use crate::schema::{
    ADDITIONAL_PROPERTIES, AGGREGATED_SCHEMA_FILE, DEFAULT_ID_BASE_URI, ID, TITLE,
    UNEVALUATED_PROPERTIES,
};
use crate::source::{FragmentSource, SchemaLocator};

/// Aggregates the values schema of a chart with the schemas of its
/// dependencies.
///
/// The aggregator holds the collaborators of one chart: the repository
/// mappings, the source of remote schemas, the locator of sibling charts,
/// the extraction tree snapshot and, optionally, the chart's own values
/// schema. It is reusable: every call to [`Aggregator::aggregate`] starts
/// from a fresh registry.
pub struct Aggregator {
    mappings: RepositoryMappings,
    fragments: Box<dyn FragmentSource>,
    locator: Box<dyn SchemaLocator>,
    extracted: MemoryFS,
    id_base_uri: String,
    chart_schema: Option<(PathBuf, Vec<u8>)>,
}

impl Aggregator {
    pub fn new(
        mappings: RepositoryMappings,
        fragments: Box<dyn FragmentSource>,
        locator: Box<dyn SchemaLocator>,
    ) -> Self {
        Self {
            mappings,
            fragments,
            locator,
            extracted: MemoryFS::new(),
            id_base_uri: DEFAULT_ID_BASE_URI.to_string(),
            chart_schema: None,
        }
    }

    /// Snapshot of the extraction tree of packaged dependencies.
    pub fn with_extracted(mut self, extracted: MemoryFS) -> Self {
        self.extracted = extracted;
        self
    }

    pub fn with_id_base_uri(mut self, id_base_uri: impl Into<String>) -> Self {
        self.id_base_uri = id_base_uri.into();
        self
    }

    /// Hand-written values schema of the chart, with the path it was read from.
    pub fn with_chart_schema(mut self, origin: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        self.chart_schema = Some((origin.into(), content));
        self
    }

    pub fn mappings(&self) -> &RepositoryMappings {
        &self.mappings
    }

    /// `$id` of the aggregated document of `chart`.
    pub fn document_id(&self, chart: &Chart) -> String {
        format!(
            "{}/{}/{}/{}",
            self.id_base_uri.trim_end_matches('/'),
            chart.name,
            chart.version,
            AGGREGATED_SCHEMA_FILE
        )
    }

    /// Aggregates the base document generated from `chart`.
    pub fn aggregate_generated(
        &self,
        chart: &Chart,
        pre_aggregation: Option<&OverlayPatch>,
        post_aggregation: Option<&OverlayPatch>,
    ) -> Result<MergedDocument> {
        let base = generate_base_schema(chart, &self.mappings);
        self.aggregate(chart, base, pre_aggregation, post_aggregation)
    }

    /// Aggregates `base` with every schema reachable from the dependencies
    /// of `chart`.
    ///
    /// The stages run in this order:
    /// 1. pre-aggregation patch, then `$id`, title and strictness of the root
    /// 2. remote schemas
    /// 3. extraction tree
    /// 4. sibling charts
    /// 5. the chart's own schema
    /// 6. global values description
    /// 7. repair of broken references
    /// 8. post-aggregation patch
    ///
    /// # Errors
    ///
    /// Only when the chart has no name (`Error::MissingPackageMetadata`) or
    /// the base document is not a JSON object (`Error::MissingBaseDocument`).
    /// Any other failure is logged and left as a marker in the document.
    pub fn aggregate(
        &self,
        chart: &Chart,
        base: Value,
        pre_aggregation: Option<&OverlayPatch>,
        post_aggregation: Option<&OverlayPatch>,
    ) -> Result<MergedDocument> {
        if chart.name.trim().is_empty() {
            return Err(Error::MissingPackageMetadata {
                message: "chart name is empty".to_string(),
                hint: None,
            });
        }
        let mut document = base;
        require_object(&document, "base document")?;

        apply_overlay(&mut document, pre_aggregation, PatchStage::PreAggregation);
        require_object(&document, "base document after the pre-aggregation patch")?;
        self.set_root_identity(&mut document, chart);

        let mut registry = EmbeddedFragmentRegistry::new();

        let downloaded = DownloadedFragmentAggregator::new(self.fragments.as_ref());
        rewrite_references(&mut document, &downloaded.ref_mappings(chart, &self.mappings));
        downloaded.aggregate_dependencies(&mut document, chart, &self.mappings, &mut registry);

        if !self.extracted.is_empty() {
            ExtractedFragmentAggregator::new(&self.extracted).aggregate(&mut document, &mut registry);
        }

        let local = LocalFragmentAggregator::new(self.locator.as_ref());
        rewrite_references(&mut document, &local.ref_mappings(chart));
        local.aggregate_dependencies(&mut document, chart, &mut registry);
        remove_legacy_global_references(&mut document, chart);

        if let Some((origin, content)) = &self.chart_schema {
            local.embed_chart_schema(&mut document, chart, origin, content, &mut registry);
        }
        GlobalDescriptionComposer::new(&self.mappings).compose(&mut document, chart);

        let removed_references = remove_invalid_references(&mut document);
        if !removed_references.is_empty() {
            debug!("Removed {} invalid references", removed_references.len());
        }

        apply_overlay(&mut document, post_aggregation, PatchStage::PostAggregation);
        info!(
            "Aggregated {} schemas for chart {}",
            registry.len(),
            chart.label()
        );

        Ok(MergedDocument {
            document,
            registry,
            removed_references,
        })
    }

    fn set_root_identity(&self, document: &mut Value, chart: &Chart) {
        if let Some(root) = document.as_object_mut() {
            root.insert(ID.to_string(), Value::String(self.document_id(chart)));
            root.insert(TITLE.to_string(), Value::String(values_title(chart)));
            root.insert(UNEVALUATED_PROPERTIES.to_string(), Value::Bool(false));
            root.insert(ADDITIONAL_PROPERTIES.to_string(), Value::Bool(false));
        }
    }
}

fn require_object(document: &Value, what: &str) -> Result<()> {
    let kind = match document {
        Value::Object(_) => return Ok(()),
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
    };
    Err(Error::MissingBaseDocument {
        message: format!("expected a JSON object as {}, found {}", what, kind),
    })
}

/// Result of one aggregation.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    /// The self-contained schema.
    pub document: Value,
    /// Every embedded source, with its pointer.
    pub registry: EmbeddedFragmentRegistry,
    /// References removed by the repair stage.
    pub removed_references: Vec<String>,
}

impl MergedDocument {
    /// Pretty-printed JSON, with a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.document)?;
        json.push('\n');
        Ok(json)
    }

    /// Writes the document to `path`, creating missing parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartDependency, RepositoryMapping};
    use serde_json::json;

    fn aggregator() -> Aggregator {
        Aggregator::new(
            RepositoryMappings::new(),
            Box::new(MemoryFS::new()),
            Box::new(MemoryFS::new()),
        )
    }

    #[test]
    fn test_missing_chart_name_is_fatal() {
        let error = aggregator()
            .aggregate(&Chart::default(), json!({}), None, None)
            .unwrap_err();
        assert!(matches!(error, Error::MissingPackageMetadata { .. }));
    }

    #[test]
    fn test_missing_base_document_is_fatal() {
        let chart = Chart::new("app", "1.0.0");
        let error = aggregator()
            .aggregate(&chart, Value::Null, None, None)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Missing base schema document: expected a JSON object as base document, found nothing"
        );
    }

    #[test]
    fn test_root_identity() {
        let chart = Chart::new("app", "1.0.0");
        let merged = aggregator()
            .with_id_base_uri("https://schemas.example.com/")
            .aggregate(&chart, json!({ "title": "old" }), None, None)
            .unwrap();
        assert_eq!(
            merged.document["$id"],
            "https://schemas.example.com/app/1.0.0/aggregated-values.schema.json"
        );
        assert_eq!(merged.document["title"], "Configuration for chart app:1.0.0");
        assert_eq!(merged.document["additionalProperties"], false);
        assert_eq!(merged.document["unevaluatedProperties"], false);
    }

    #[test]
    fn test_unknown_repository_is_skipped() {
        let mut mappings = RepositoryMappings::new();
        mappings.insert(
            "@charts".into(),
            RepositoryMapping::new("@charts", "https://charts.example.com"),
        );
        let aggregator = Aggregator::new(
            mappings,
            Box::new(MemoryFS::new()),
            Box::new(MemoryFS::new()),
        );
        let chart = Chart::new("app", "1.0.0")
            .with_dependency(ChartDependency::new("a", "1.0").with_repository("@unknown"));
        let merged = aggregator.aggregate_generated(&chart, None, None).unwrap();
        assert!(merged.registry.is_empty());
        assert!(merged.document.get("$defs").is_none());
    }

    #[test]
    fn test_to_json_string_ends_with_newline() {
        let chart = Chart::new("app", "1.0.0");
        let merged = aggregator().aggregate_generated(&chart, None, None).unwrap();
        let json = merged.to_json_string().unwrap();
        assert!(json.ends_with("}\n"));
        assert!(json.starts_with("{\n  \"$schema\""));
    }

    #[test]
    fn test_write_to_creates_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let chart = Chart::new("app", "1.0.0");
        let merged = aggregator().aggregate_generated(&chart, None, None).unwrap();
        let path = temp.path().join("build/helm-values/aggregated-values.schema.json");
        merged.write_to(&path).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, merged.document);
    }
}
