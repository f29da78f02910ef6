//! # Chart Model
//!
//! Typed view of the package metadata consumed by aggregation: the chart read
//! from `Chart.yaml`, its dependencies, and the schema repositories that
//! publish values schemas for remote dependencies.
//!
//! ## Dependency classification
//!
//! A dependency's [`DependencySource`] is derived from its `repository`:
//!
//! - `file://...` designates a chart stored next to the current one,
//! - any other value is the id of a schema repository (e.g. `@charts`),
//! - no repository at all leaves the dependency unclassified.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::schema::VALUES_SCHEMA_FILE;

/// Prefix of the `repository` of a chart stored locally.
pub const LOCAL_REPOSITORY_PREFIX: &str = "file://";

/// Helm chart metadata, as found in `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

impl Chart {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: Some("v2".to_string()),
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: ChartDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// `<name>:<version>`, as used in generated titles.
    pub fn label(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// Where the values schema of a dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource<'a> {
    /// Published by the schema repository with this id.
    Remote(&'a str),
    /// Chart stored locally, next to the current chart.
    Local,
    /// No repository declared.
    Unclassified,
}

/// Dependency entry of `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ChartDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn source(&self) -> DependencySource<'_> {
        match self.repository.as_deref() {
            Some(repository) if repository.starts_with(LOCAL_REPOSITORY_PREFIX) => {
                DependencySource::Local
            }
            Some(repository) => DependencySource::Remote(repository),
            None => DependencySource::Unclassified,
        }
    }

    pub fn is_stored_locally(&self) -> bool {
        self.source() == DependencySource::Local
    }

    /// Key of the dependency values in the chart values: alias, or name.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Human readable name: `name[:version]` for local charts,
    /// `[repository/]name[:version]` otherwise.
    pub fn full_name(&self) -> String {
        let version = self
            .version
            .as_ref()
            .map(|version| format!(":{}", version))
            .unwrap_or_default();
        match self.repository.as_deref() {
            Some(repository) if !self.is_stored_locally() => {
                format!("{}/{}{}", repository, self.name, version)
            }
            _ => format!("{}{}", self.name, version),
        }
    }

    /// Version usable as a path segment.
    ///
    /// Every character outside `[A-Za-z0-9._+-]` (version ranges, spaces) is
    /// replaced by `_`.
    pub fn sanitized_version(&self) -> String {
        self.version
            .as_deref()
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Values key toggled by the dependency condition, when it has the
    /// conventional `<key>.enabled` form.
    pub fn enabled_condition(&self) -> bool {
        self.condition.as_deref() == Some(format!("{}.enabled", self.key()).as_str())
    }
}

fn default_values_schema_file() -> String {
    VALUES_SCHEMA_FILE.to_string()
}

/// Schema repository publishing the values schemas of remote charts.
///
/// Schemas are published at `<base-uri>/<chart name>/<chart version>/<values-schema-file>`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepositoryMapping {
    /// Repository id, as written in the `repository` of dependencies.
    #[serde(skip)]
    pub id: String,
    pub base_uri: String,
    #[serde(default = "default_values_schema_file")]
    pub values_schema_file: String,
    /// Value of the `Authorization` header used by the downloader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
}

impl fmt::Debug for RepositoryMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryMapping")
            .field("id", &self.id)
            .field("base_uri", &self.base_uri)
            .field("values_schema_file", &self.values_schema_file)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl RepositoryMapping {
    pub fn new(id: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_uri: base_uri.into(),
            values_schema_file: default_values_schema_file(),
            authorization: None,
        }
    }

    pub fn with_values_schema_file(mut self, file: impl Into<String>) -> Self {
        self.values_schema_file = file.into();
        self
    }

    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    fn base(&self) -> &str {
        self.base_uri.trim_end_matches('/')
    }

    /// `<base-uri>/<name>/<version>`: location of everything published for
    /// one chart version.
    pub fn chart_uri(&self, dependency: &ChartDependency) -> String {
        format!(
            "{}/{}/{}",
            self.base(),
            dependency.name,
            dependency.version.as_deref().unwrap_or_default()
        )
    }

    /// URI of the values schema published for `dependency`.
    pub fn fragment_uri(&self, dependency: &ChartDependency) -> Result<Url> {
        let uri = format!("{}/{}", self.chart_uri(dependency), self.values_schema_file);
        Ok(Url::parse(&uri)?)
    }
}

/// Schema repositories by id.
pub type RepositoryMappings = BTreeMap<String, RepositoryMapping>;

/// Repository mapping of a remote dependency, if its id is configured.
pub fn mapping_for<'a>(
    mappings: &'a RepositoryMappings,
    dependency: &ChartDependency,
) -> Option<&'a RepositoryMapping> {
    match dependency.source() {
        DependencySource::Remote(id) => mappings.get(id),
        _ => None,
    }
}
