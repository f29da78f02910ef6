//! # Configuration Parsing
//!
//! This module defines the `.helm-values.yaml` configuration file and loads
//! the `Chart.yaml` metadata of the chart being aggregated.
//!
//! ## Configuration file
//!
//! ```yaml
//! id-base-uri: https://schemas.example.com
//! repositories:
//!   "@charts":
//!     base-uri: https://charts.example.com/schemas
//!     values-schema-file: values.schema.json
//!     authorization: "Basic ..."
//! ```
//!
//! Every key is optional. Unknown keys are rejected so that a typo never
//! silently disables a repository.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::model::{Chart, RepositoryMappings};
use crate::schema::DEFAULT_ID_BASE_URI;

/// Default configuration file name, looked up in the chart directory.
pub const CONFIG_FILE: &str = ".helm-values.yaml";
/// Chart metadata file name.
pub const CHART_FILE: &str = "Chart.yaml";

fn default_id_base_uri() -> String {
    DEFAULT_ID_BASE_URI.to_string()
}

/// Parsed `.helm-values.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Base URI of the `$id` of aggregated documents.
    #[serde(default = "default_id_base_uri")]
    pub id_base_uri: String,
    /// Schema repositories by id.
    #[serde(default)]
    pub repositories: RepositoryMappings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_base_uri: default_id_base_uri(),
            repositories: RepositoryMappings::new(),
        }
    }
}

/// Parses a YAML string into a `Config`.
///
/// An empty document is the default configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    let mut config: Config =
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some(
                "Supported keys are `id-base-uri` and `repositories.<id>.{base-uri, values-schema-file, authorization}`"
                    .to_string(),
            ),
        })?;
    for (id, mapping) in config.repositories.iter_mut() {
        mapping.id = id.clone();
        validate_uri(&mapping.base_uri, &format!("repositories.{}.base-uri", id))?;
    }
    validate_uri(&config.id_base_uri, "id-base-uri")?;
    Ok(config)
}

fn validate_uri(uri: &str, key: &str) -> Result<()> {
    Url::parse(uri).map_err(|e| Error::ConfigParse {
        message: format!("invalid `{}` \"{}\": {}", key, uri, e),
        hint: Some("Use an absolute URI such as https://charts.example.com/schemas".to_string()),
    })?;
    Ok(())
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Parses `path` if it exists, returns the default configuration otherwise.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if path.is_file() {
        from_file(path)
    } else {
        Ok(Config::default())
    }
}

/// Parses chart metadata from a YAML string.
pub fn parse_chart(yaml_content: &str) -> Result<Chart> {
    let chart: Chart =
        serde_yaml::from_str(yaml_content).map_err(|e| Error::MissingPackageMetadata {
            message: format!("unparsable chart metadata: {}", e),
            hint: Some(format!("Check the syntax of {}", CHART_FILE)),
        })?;
    if chart.name.trim().is_empty() {
        return Err(Error::MissingPackageMetadata {
            message: "chart name is empty".to_string(),
            hint: Some(format!("Set `name` in {}", CHART_FILE)),
        });
    }
    Ok(chart)
}

/// Loads `Chart.yaml` from `chart_dir`.
pub fn load_chart<P: AsRef<Path>>(chart_dir: P) -> Result<Chart> {
    let path = chart_dir.as_ref().join(CHART_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::MissingPackageMetadata {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: Some("Run from a chart directory or pass --chart-dir".to_string()),
    })?;
    parse_chart(&content)
}
