//! Base values schema generation
//!
//! Produces the document aggregation starts from when none is supplied: a
//! root schema with one property per dependency, each referencing the values
//! schema of that dependency, and an open `global` property.

use log::warn;
use serde_json::{json, Map, Value};

use crate::model::{mapping_for, Chart, ChartDependency, DependencySource, RepositoryMappings};
use crate::schema::{
    ALL_OF, GENERATED_BY, GENERATOR_LABEL, GLOBAL, ID, PROPERTIES, REF, SCHEMA, SCHEMA_VERSION,
    TITLE, TYPE, VALUES_SCHEMA_FILE,
};

/// Title of the values schema of `chart`.
pub fn values_title(chart: &Chart) -> String {
    format!("Configuration for chart {}", chart.label())
}

/// Generates the values schema of `chart`.
pub fn generate_base_schema(chart: &Chart, mappings: &RepositoryMappings) -> Value {
    let mut properties = Map::new();
    for dependency in &chart.dependencies {
        if let Some(property) = dependency_property(dependency, mappings) {
            properties.insert(dependency.key().to_string(), property);
        }
    }
    properties.insert(GLOBAL.to_string(), json!({ TYPE: "object", ALL_OF: [] }));

    let mut schema = Map::new();
    schema.insert(SCHEMA.to_string(), json!(SCHEMA_VERSION));
    schema.insert(
        ID.to_string(),
        json!(format!("{}/{}/{}", chart.name, chart.version, VALUES_SCHEMA_FILE)),
    );
    schema.insert(GENERATED_BY.to_string(), json!(GENERATOR_LABEL));
    schema.insert(TITLE.to_string(), json!(values_title(chart)));
    schema.insert(PROPERTIES.to_string(), Value::Object(properties));
    Value::Object(schema)
}

/// Reference to the values schema of `dependency`, as written in the
/// generated document.
pub fn dependency_reference(
    dependency: &ChartDependency,
    mappings: &RepositoryMappings,
) -> Option<String> {
    match dependency.source() {
        DependencySource::Local => Some(format!(
            "../../{}/{}/{}",
            dependency.name,
            dependency.sanitized_version(),
            VALUES_SCHEMA_FILE
        )),
        DependencySource::Remote(_) => {
            let mapping = mapping_for(mappings, dependency)?;
            dependency.version.as_ref()?;
            match mapping.fragment_uri(dependency) {
                Ok(uri) => Some(uri.to_string()),
                Err(e) => {
                    warn!("Skipping schema of dependency {}: {}", dependency.full_name(), e);
                    None
                }
            }
        }
        DependencySource::Unclassified => None,
    }
}

fn dependency_property(dependency: &ChartDependency, mappings: &RepositoryMappings) -> Option<Value> {
    let reference = dependency_reference(dependency, mappings);
    if reference.is_none() && !dependency.enabled_condition() {
        return None;
    }
    let mut property = Map::new();
    if let Some(reference) = reference {
        property.insert(REF.to_string(), json!(reference));
    }
    if dependency.enabled_condition() {
        property.insert(
            PROPERTIES.to_string(),
            json!({
                "enabled": {
                    TYPE: "boolean",
                    TITLE: format!("Enable {} dependency", dependency.full_name()),
                }
            }),
        );
    }
    Some(Value::Object(property))
}
