//! # Helm Values Library
//!
//! This library aggregates the JSON schema of the values of a Helm chart with
//! the schemas of all its dependencies into one self-contained document. IDEs
//! and validators can then offer completion and validation of `values.yaml`
//! files without resolving any reference at use time.
//!
//! ## Quick Example
//!
//! ```
//! use helm_values::aggregate::Aggregator;
//! use helm_values::filesystem::MemoryFS;
//! use helm_values::model::{Chart, ChartDependency, RepositoryMapping, RepositoryMappings};
//!
//! // Schemas already downloaded, mirrored by host and path
//! let mut downloads = MemoryFS::new();
//! downloads.add_file_string(
//!     "charts.example.com/db/1.0.0/values.schema.json",
//!     r#"{ "properties": { "port": { "type": "integer" } } }"#,
//! );
//!
//! let mut mappings = RepositoryMappings::new();
//! mappings.insert(
//!     "@charts".into(),
//!     RepositoryMapping::new("@charts", "https://charts.example.com"),
//! );
//! let chart = Chart::new("app", "0.1.0")
//!     .with_dependency(ChartDependency::new("db", "1.0.0").with_repository("@charts"));
//!
//! let aggregator = Aggregator::new(mappings, Box::new(downloads), Box::new(MemoryFS::new()));
//! let merged = aggregator.aggregate_generated(&chart, None, None).unwrap();
//! assert_eq!(
//!     merged.document["properties"]["db"]["$ref"],
//!     "#/$defs/downloaded/charts.example.com/db/1.0.0/values.schema.json"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Model (`model`, `config`)**: The chart and its dependencies, read from
//!   `Chart.yaml`, and the schema repositories configured in `.helm-values.yaml`.
//! - **Pointers and references (`pointer`, `reference`)**: Addressing nodes of
//!   a document, classifying `$ref` values and rewriting them by prefix.
//! - **Sources (`source`, `filesystem`)**: Read-only access to schemas already
//!   downloaded, extracted or generated by other tools.
//! - **Aggregation (`aggregate`)**: The pipeline embedding every reachable
//!   schema under `$defs`, exactly once each, and repairing what remains broken.
//! - **Patches (`patch`)**: User-supplied JSON patches applied before and
//!   after aggregation.
//!
//! ## Execution Flow
//!
//! The entry point is [`aggregate::Aggregator::aggregate`]:
//!
//! 1.  **Pre-aggregation patch**: Patch the base document, then set its `$id`,
//!     title and strictness.
//! 2.  **Remote schemas**: Embed the schemas of dependencies published by schema
//!     repositories, following their references recursively.
//! 3.  **Extracted schemas**: Embed the schemas found in packaged dependencies
//!     and surface their global values.
//! 4.  **Sibling charts**: Embed the aggregated documents of charts stored
//!     next to the current one.
//! 5.  **Chart schema**: Embed the chart's own `values.schema.json`.
//! 6.  **Description**: Describe the dependencies in the global values.
//! 7.  **Repair**: Remove every reference that does not resolve.
//! 8.  **Post-aggregation patch**: Patch the merged document.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod generator;
pub mod model;
pub mod output;
pub mod patch;
pub mod pointer;
pub mod reference;
pub mod registry;
pub mod schema;
pub mod source;

#[cfg(test)]
mod reference_proptest;
