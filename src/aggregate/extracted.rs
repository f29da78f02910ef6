//! # Stage 2: Extracted Dependency Schemas
//!
//! Packaged dependencies (the archives under `charts/`) are unpacked into an
//! extraction tree mirroring the dependency hierarchy:
//!
//! ```text
//! <root>/<dependency>/values.schema.json
//! <root>/<dependency>/<sub-dependency>/values.schema.json
//! ```
//!
//! Each schema found is embedded at `$defs/extracted/<path>/values.schema.json`
//! and linked into the values schema:
//!
//! - `properties.<dependency>` references the embedded schema, nested
//!   dependencies are linked into `properties.<dependency>.properties`,
//! - the global values declared by a schema are referenced from the global
//!   values of every ancestor level, up to the chart itself.
//!
//! A directory without schema still hosts the schemas of its own nested
//! dependencies.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::{json, Map, Value};

use super::{defs_pointer, embed, fragment_or_placeholder, rebase_fragment_references};
use crate::filesystem::MemoryFS;
use crate::pointer::Pointer;
use crate::registry::{EmbeddedFragmentRegistry, SourceIdentity};
use crate::schema::{
    array_entry, global_all_of_mut, global_of, object_entry, properties_mut, push_unique,
    reference_node, ALL_OF, DESCRIPTION, EXTRACTED, EXTRACTED_GLOBAL_VALUES_TITLE, GLOBAL,
    NEW_LINE, PROPERTIES, REF, TITLE, VALUES_SCHEMA_FILE,
};
use crate::source::FetchError;

/// Directory of the extraction tree, after its schema was embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtractedDirectory {
    name: String,
    /// Path relative to the extraction root, `/`-separated.
    path: String,
    /// Embedding pointer of the schema of the directory, if any.
    schema: Option<Pointer>,
    /// Whether the embedded schema declares `properties.global`.
    declares_global: bool,
    children: Vec<ExtractedDirectory>,
}

/// Embeds and links the schemas of an extraction tree snapshot.
pub struct ExtractedFragmentAggregator<'a> {
    tree: &'a MemoryFS,
    root: Pointer,
}

impl<'a> ExtractedFragmentAggregator<'a> {
    pub fn new(tree: &'a MemoryFS) -> Self {
        Self {
            tree,
            root: defs_pointer(EXTRACTED),
        }
    }

    /// Embeds every schema of the tree into `document` and links them into
    /// its `properties`.
    pub fn aggregate(&self, document: &mut Value, registry: &mut EmbeddedFragmentRegistry) {
        let directories = self.embed_directory(document, Path::new(""), registry);
        match document.as_object_mut() {
            Some(root) => {
                link(root, &directories);
            }
            None => warn!("Cannot link extracted schemas: document is not an object"),
        }
    }

    fn embed_directory(
        &self,
        document: &mut Value,
        dir: &Path,
        registry: &mut EmbeddedFragmentRegistry,
    ) -> Vec<ExtractedDirectory> {
        self.tree
            .subdirectories(dir)
            .into_iter()
            .map(|name| {
                let path = dir.join(&name);
                let (schema, declares_global) = if self.tree.contains_file(&path, VALUES_SCHEMA_FILE) {
                    self.embed_schema(document, &path, registry)
                } else {
                    (None, false)
                };
                let children = self.embed_directory(document, &path, registry);
                ExtractedDirectory {
                    name,
                    path: slash_path(&path),
                    schema,
                    declares_global,
                    children,
                }
            })
            .collect()
    }

    fn embed_schema(
        &self,
        document: &mut Value,
        dir: &Path,
        registry: &mut EmbeddedFragmentRegistry,
    ) -> (Option<Pointer>, bool) {
        let file: PathBuf = dir.join(VALUES_SCHEMA_FILE);
        let pointer = self
            .root
            .join(dir.iter().map(|segment| segment.to_string_lossy().into_owned()))
            .child(VALUES_SCHEMA_FILE);
        if !registry.register(SourceIdentity::Extracted(file.clone()), pointer.clone()) {
            return (Some(pointer), false);
        }

        let content = self
            .tree
            .get_file(&file)
            .map(|file| file.content.clone())
            .ok_or_else(|| FetchError::Missing {
                location: file.display().to_string(),
            });
        let mut fragment = fragment_or_placeholder(content, &slash_path(&file));
        let declares_global = fragment.as_object().and_then(global_of).is_some();
        rebase_fragment_references(&mut fragment, &pointer);
        match embed(document, &pointer, fragment) {
            Ok(()) => {
                info!("Embedded extracted schema {} at {}", file.display(), pointer);
                (Some(pointer), declares_global)
            }
            Err(e) => {
                warn!("Failed to embed extracted schema {}: {}", file.display(), e);
                (None, false)
            }
        }
    }
}

/// Links `directories` into `properties` of `node`.
///
/// Returns the references to the global values declared by the directories
/// and their descendants, after adding them to the global values of `node`.
fn link(node: &mut Map<String, Value>, directories: &[ExtractedDirectory]) -> Vec<Value> {
    let mut global_references = Vec::new();
    for directory in directories {
        let child = object_entry(properties_mut(node), &directory.name);
        if let Some(schema) = &directory.schema {
            child.insert(REF.to_string(), Value::String(schema.to_fragment()));
        }

        let mut references = Vec::new();
        if directory.declares_global {
            if let Some(schema) = &directory.schema {
                references.push(reference_node(
                    schema.join([PROPERTIES, GLOBAL]).to_fragment(),
                ));
            }
        }
        references.extend(link(child, &directory.children));

        if global_of(child).is_some() {
            push_unique(
                global_all_of_mut(child),
                json!({
                    TITLE: format!("{} {} dependency", EXTRACTED_GLOBAL_VALUES_TITLE, directory.path),
                    DESCRIPTION: NEW_LINE,
                }),
            );
        }
        if child.contains_key(REF) && child.len() > 1 {
            if let Some(reference) = child.shift_remove(REF) {
                push_unique(array_entry(child, ALL_OF), json!({ REF: reference }));
            }
        }

        for reference in references {
            push_unique(global_all_of_mut(node), reference.clone());
            global_references.push(reference);
        }
    }
    global_references
}

fn slash_path(path: &Path) -> String {
    path.iter()
        .map(|segment| segment.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
