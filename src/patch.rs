//! # Overlay Patches
//!
//! Users fine-tune generated documents with RFC 6902 patches (add, remove,
//! replace, move, copy, test). Two patches are recognised in the chart
//! directory:
//!
//! - `values.schema.patch.json`, applied to the generated base document
//!   before any fragment is embedded,
//! - `aggregated-values.schema.patch.json`, applied to the merged document as
//!   the very last step.
//!
//! Both may also be written in YAML (`*.patch.yaml`). A patch is applied
//! atomically: when one operation fails, the document is left as it was.

use std::fmt;
use std::path::{Path, PathBuf};

use json_patch::Patch;
use log::warn;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{
    PATCH_AGGREGATED_SCHEMA_FILE, PATCH_AGGREGATED_SCHEMA_YAML_FILE, PATCH_VALUES_SCHEMA_FILE,
    PATCH_VALUES_SCHEMA_YAML_FILE,
};

/// Point of the pipeline a patch applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStage {
    PreAggregation,
    PostAggregation,
}

impl PatchStage {
    /// Patch file names looked up for this stage, in priority order.
    pub fn file_names(self) -> [&'static str; 2] {
        match self {
            Self::PreAggregation => [PATCH_VALUES_SCHEMA_FILE, PATCH_VALUES_SCHEMA_YAML_FILE],
            Self::PostAggregation => [
                PATCH_AGGREGATED_SCHEMA_FILE,
                PATCH_AGGREGATED_SCHEMA_YAML_FILE,
            ],
        }
    }
}

impl fmt::Display for PatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreAggregation => f.write_str("pre-aggregation"),
            Self::PostAggregation => f.write_str("post-aggregation"),
        }
    }
}

/// Parsed JSON patch, with the location it was read from.
#[derive(Debug, Clone)]
pub struct OverlayPatch {
    patch: Patch,
    origin: String,
}

impl OverlayPatch {
    pub fn new(patch: Patch, origin: impl Into<String>) -> Self {
        Self {
            patch,
            origin: origin.into(),
        }
    }

    pub fn from_json_str(content: &str, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let patch = serde_json::from_str(content).map_err(|e| Error::Patch {
            stage: origin.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(patch, origin))
    }

    pub fn from_yaml_str(content: &str, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let patch = serde_yaml::from_str(content).map_err(|e| Error::Patch {
            stage: origin.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(patch, origin))
    }

    /// Reads a patch file, as YAML for `.yaml`/`.yml` extensions and as JSON
    /// otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let origin = path.display().to_string();
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content, origin),
            _ => Self::from_json_str(&content, origin),
        }
    }

    /// Reads the patch of `stage` from `dir`, if one of its files exists.
    pub fn load_optional<P: AsRef<Path>>(dir: P, stage: PatchStage) -> Result<Option<Self>> {
        let dir = dir.as_ref();
        let found: Option<PathBuf> = stage
            .file_names()
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file());
        found.map(Self::from_file).transpose()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.patch.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patch.0.is_empty()
    }

    /// Applies every operation to `document`, or none of them.
    pub fn apply(&self, document: &mut Value) -> Result<()> {
        json_patch::patch(document, &self.patch.0).map_err(|e| Error::Patch {
            stage: self.origin.clone(),
            message: e.to_string(),
        })
    }
}

/// Applies an optional patch, logging and ignoring a failure.
///
/// Returns `true` when a patch was applied.
pub fn apply_overlay(document: &mut Value, patch: Option<&OverlayPatch>, stage: PatchStage) -> bool {
    let Some(patch) = patch else {
        return false;
    };
    match patch.apply(document) {
        Ok(()) => true,
        Err(e) => {
            warn!("Ignoring {} patch {}: {}", stage, patch.origin(), e);
            false
        }
    }
}
