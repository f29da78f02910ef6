//! # Stage 1: Remote Schemas
//!
//! Embeds the values schemas published by schema repositories, and every
//! schema they reference, under `$defs/downloaded`.
//!
//! The embedding pointer of a schema mirrors its URI: host (and port)
//! followed by the URI path, so that
//! `https://charts.example.com/a/1.0/values.schema.json` lands at
//! `#/$defs/downloaded/charts.example.com/a/1.0/values.schema.json`.
//!
//! Inside an embedded schema, fragment references are rebased on the
//! embedding pointer, and relative or absolute references are resolved
//! against the schema URI, aggregated recursively, and rewritten to the
//! pointer of their target.

use log::{debug, info, warn};
use serde_json::Value;
use url::Url;

use super::{defs_pointer, embed, fragment_or_placeholder};
use crate::model::{Chart, ChartDependency, DependencySource, RepositoryMappings};
use crate::pointer::Pointer;
use crate::reference::{for_each_reference_mut, RefMapping, Reference};
use crate::registry::{EmbeddedFragmentRegistry, SourceIdentity};
use crate::schema::DOWNLOADED;
use crate::source::{mirrored_segments, FragmentSource};

/// Embeds remote schemas read from a [`FragmentSource`].
pub struct DownloadedFragmentAggregator<'a> {
    source: &'a dyn FragmentSource,
    root: Pointer,
}

impl<'a> DownloadedFragmentAggregator<'a> {
    pub fn new(source: &'a dyn FragmentSource) -> Self {
        Self {
            source,
            root: defs_pointer(DOWNLOADED),
        }
    }

    /// Embedding pointer of the schema published at `uri`.
    pub fn pointer_for(&self, uri: &Url) -> Pointer {
        self.root.join(mirrored_segments(uri))
    }

    /// Mappings rewriting the references of the base document to remote
    /// schemas into references to their embedding pointers.
    ///
    /// Every configured remote dependency maps its chart location
    /// (`<base-uri>/<name>/<version>/`) to the pointer mirroring it.
    pub fn ref_mappings(&self, chart: &Chart, mappings: &RepositoryMappings) -> Vec<RefMapping> {
        remote_dependencies(chart, mappings)
            .filter_map(|(_, uri)| {
                let chart_location = uri.join(".").ok()?;
                let pointer = self.pointer_for(&uri).parent()?;
                Some(RefMapping::new(
                    chart_location.to_string(),
                    format!("{}/", pointer.to_fragment()),
                ))
            })
            .collect()
    }

    /// Aggregates the schema of every configured remote dependency.
    pub fn aggregate_dependencies(
        &self,
        document: &mut Value,
        chart: &Chart,
        mappings: &RepositoryMappings,
        registry: &mut EmbeddedFragmentRegistry,
    ) {
        for (dependency, uri) in remote_dependencies(chart, mappings) {
            debug!("Aggregating schema of dependency {}", dependency.full_name());
            self.aggregate(document, &uri, registry);
        }
    }

    /// Embeds the schema published at `uri` and, recursively, everything it
    /// references. Returns its embedding pointer.
    ///
    /// A schema already embedded is not read again: its registered pointer
    /// is returned. A URI mirroring to the pointer of another source resolves
    /// to that source's schema. A URI without host or path segments has no
    /// embedding pointer and yields `None`.
    pub fn aggregate(
        &self,
        document: &mut Value,
        uri: &Url,
        registry: &mut EmbeddedFragmentRegistry,
    ) -> Option<Pointer> {
        let identity = SourceIdentity::Uri(uri.to_string());
        if let Some(pointer) = registry.get(&identity) {
            return Some(pointer.clone());
        }
        let segments = mirrored_segments(uri);
        if segments.is_empty() {
            warn!("Skipping schema {}: no host or path to embed it under", uri);
            return None;
        }
        let pointer = self.root.join(segments);
        if let Some(owner) = registry.owner_of(&pointer) {
            warn!(
                "Skipping schema {}: {} is already embedded at {}",
                uri, owner, pointer
            );
            return Some(pointer);
        }
        registry.register(identity, pointer.clone());

        let mut fragment = fragment_or_placeholder(self.source.fetch(uri), uri.as_str());
        self.resolve_references(document, &mut fragment, uri, &pointer, registry);
        match embed(document, &pointer, fragment) {
            Ok(()) => info!("Embedded {} at {}", uri, pointer),
            Err(e) => warn!("Failed to embed schema {}: {}", uri, e),
        }
        Some(pointer)
    }

    fn resolve_references(
        &self,
        document: &mut Value,
        fragment: &mut Value,
        base: &Url,
        pointer: &Pointer,
        registry: &mut EmbeddedFragmentRegistry,
    ) {
        let internal = RefMapping::new("#", pointer.to_fragment());
        for_each_reference_mut(fragment, &mut |reference: &mut String| {
            let classified = Reference::classify(reference);
            if classified.is_fragment() {
                if let Some(mapped) = internal.map(reference) {
                    *reference = mapped;
                }
                return;
            }
            match classified.resolve(base) {
                Ok((target, suffix)) => {
                    if let Some(target_pointer) = self.aggregate(document, &target, registry) {
                        *reference = format!("{}{}", target_pointer.to_fragment(), suffix);
                    }
                }
                Err(e) => warn!("Failed to aggregate schema for ref \"{}\": {}", reference, e),
            }
        });
    }
}

/// Remote dependencies whose repository is configured, with the URI of
/// their values schema.
fn remote_dependencies<'c>(
    chart: &'c Chart,
    mappings: &'c RepositoryMappings,
) -> impl Iterator<Item = (&'c ChartDependency, Url)> + 'c {
    chart.dependencies.iter().filter_map(move |dependency| {
        let DependencySource::Remote(id) = dependency.source() else {
            return None;
        };
        let Some(mapping) = mappings.get(id) else {
            debug!(
                "Skipping dependency {}: repository {} is not configured",
                dependency.full_name(),
                id
            );
            return None;
        };
        if dependency.version.is_none() {
            debug!("Skipping dependency {}: no version", dependency.full_name());
            return None;
        }
        match mapping.fragment_uri(dependency) {
            Ok(uri) => Some((dependency, uri)),
            Err(e) => {
                warn!("Skipping dependency {}: {}", dependency.full_name(), e);
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFS;
    use crate::model::RepositoryMapping;
    use serde_json::json;

    const BASE: &str = "https://charts.example.com/schemas";

    fn mappings() -> RepositoryMappings {
        let mut mappings = RepositoryMappings::new();
        mappings.insert("@charts".into(), RepositoryMapping::new("@charts", BASE));
        mappings
    }

    fn uri(path: &str) -> Url {
        Url::parse(&format!("{}/{}", BASE, path)).unwrap()
    }

    fn downloads(files: &[(&str, Value)]) -> MemoryFS {
        let mut fs = MemoryFS::new();
        for (path, content) in files {
            fs.add_file_string(
                format!("charts.example.com/schemas/{}", path),
                &content.to_string(),
            );
        }
        fs
    }

    #[test]
    fn test_ref_mappings() {
        let fs = MemoryFS::new();
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let chart = Chart::new("app", "1.0")
            .with_dependency(ChartDependency::new("a", "2.0").with_repository("@charts"))
            .with_dependency(ChartDependency::new("b", "1.0").with_repository("@unknown"))
            .with_dependency(ChartDependency::new("c", "1.0").with_repository("file://../c"));
        assert_eq!(
            aggregator.ref_mappings(&chart, &mappings()),
            vec![RefMapping::new(
                "https://charts.example.com/schemas/a/2.0/",
                "#/$defs/downloaded/charts.example.com/schemas/a/2.0/"
            )]
        );
    }

    #[test]
    fn test_fragment_references_are_rebased() {
        let fs = downloads(&[(
            "a/1.0/values.schema.json",
            json!({
                "additionalProperties": false,
                "properties": { "x": { "$ref": "#/$defs/x" } },
                "$defs": { "x": { "type": "string" } }
            }),
        )]);
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let pointer = aggregator
            .aggregate(&mut document, &uri("a/1.0/values.schema.json"), &mut registry)
            .unwrap();

        assert_eq!(
            pointer.to_fragment(),
            "#/$defs/downloaded/charts.example.com/schemas/a/1.0/values.schema.json"
        );
        let embedded = pointer.resolve(&document).unwrap();
        assert_eq!(
            embedded["properties"]["x"]["$ref"],
            "#/$defs/downloaded/charts.example.com/schemas/a/1.0/values.schema.json/$defs/x"
        );
        assert!(embedded.get("additionalProperties").is_none());
    }

    #[test]
    fn test_relative_reference_is_followed_once() {
        let fs = downloads(&[
            (
                "a/2.0/values.schema.json",
                json!({
                    "properties": {
                        "x": { "$ref": "../../x/1.0/values.schema.json" },
                        "y": { "$ref": "../../x/1.0/values.schema.json#/properties/name" }
                    }
                }),
            ),
            (
                "x/1.0/values.schema.json",
                json!({ "properties": { "name": { "type": "string" } } }),
            ),
        ]);
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let pointer = aggregator
            .aggregate(&mut document, &uri("a/2.0/values.schema.json"), &mut registry)
            .unwrap();

        let x = "#/$defs/downloaded/charts.example.com/schemas/x/1.0/values.schema.json";
        let embedded = pointer.resolve(&document).unwrap();
        assert_eq!(embedded["properties"]["x"]["$ref"], x);
        assert_eq!(
            embedded["properties"]["y"]["$ref"],
            format!("{}/properties/name", x)
        );
        assert_eq!(registry.len(), 2);
        assert!(Pointer::parse_fragment(x).unwrap().resolve(&document).is_some());
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let fs = downloads(&[
            (
                "a/1.0/values.schema.json",
                json!({ "properties": { "b": { "$ref": "../../b/1.0/values.schema.json" } } }),
            ),
            (
                "b/1.0/values.schema.json",
                json!({ "properties": { "a": { "$ref": "../../a/1.0/values.schema.json" } } }),
            ),
        ]);
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let a = aggregator
            .aggregate(&mut document, &uri("a/1.0/values.schema.json"), &mut registry)
            .unwrap();
        let b = registry
            .get(&SourceIdentity::Uri(uri("b/1.0/values.schema.json").to_string()))
            .unwrap()
            .clone();
        assert_eq!(
            b.resolve(&document).unwrap()["properties"]["a"]["$ref"],
            a.to_fragment()
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_missing_schema_becomes_placeholder() {
        testing_logger::setup();
        let fs = MemoryFS::new();
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let pointer = aggregator
            .aggregate(&mut document, &uri("a/1.0/values.schema.json"), &mut registry)
            .unwrap();

        let embedded = pointer.resolve(&document).unwrap();
        assert_eq!(embedded["type"], "object");
        assert!(embedded["$error"]
            .as_str()
            .unwrap()
            .starts_with("No schema found at"));
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("Failed to load schema")));
        });
    }

    #[test]
    fn test_reference_without_host_or_path_is_left_unchanged() {
        testing_logger::setup();
        let fs = downloads(&[(
            "a/1.0/values.schema.json",
            json!({ "properties": { "id": { "$ref": "urn:example:thing" } } }),
        )]);
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let pointer = aggregator
            .aggregate(&mut document, &uri("a/1.0/values.schema.json"), &mut registry)
            .unwrap();

        let embedded = pointer.resolve(&document).unwrap();
        assert_eq!(embedded["properties"]["id"]["$ref"], "urn:example:thing");
        let downloaded = &document["$defs"]["downloaded"];
        assert!(downloaded.get("$error").is_none());
        assert!(downloaded.get("type").is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            aggregator.aggregate(
                &mut document,
                &Url::parse("urn:example:thing").unwrap(),
                &mut registry
            ),
            None
        );
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("urn:example:thing")));
        });
    }

    #[test]
    fn test_uris_mirroring_to_same_pointer_are_embedded_once() {
        let fs = downloads(&[
            (
                "a/1.0/values.schema.json",
                json!({
                    "properties": {
                        "secure": { "$ref": "https://charts.example.com/schemas/b/1.0/values.schema.json" },
                        "plain": { "$ref": "http://charts.example.com/schemas/b/1.0/values.schema.json" }
                    }
                }),
            ),
            (
                "b/1.0/values.schema.json",
                json!({ "properties": { "name": { "type": "string" } } }),
            ),
        ]);
        let aggregator = DownloadedFragmentAggregator::new(&fs);
        let mut document = json!({});
        let mut registry = EmbeddedFragmentRegistry::new();
        let a = aggregator
            .aggregate(&mut document, &uri("a/1.0/values.schema.json"), &mut registry)
            .unwrap();

        let b = "#/$defs/downloaded/charts.example.com/schemas/b/1.0/values.schema.json";
        let embedded = a.resolve(&document).unwrap();
        assert_eq!(embedded["properties"]["secure"]["$ref"], b);
        assert_eq!(embedded["properties"]["plain"]["$ref"], b);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.owner_of(&Pointer::parse_fragment(b).unwrap()),
            Some(&SourceIdentity::Uri(uri("b/1.0/values.schema.json").to_string()))
        );
    }
}
