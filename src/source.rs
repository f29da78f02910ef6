//! # Fragment Sources
//!
//! Aggregation works on bytes that external collaborators already put on
//! disk: the downloader mirrors remote schemas into a download directory, the
//! unpacker extracts dependency archives into an extraction root, and sibling
//! charts produce their own aggregated documents. This module defines the two
//! seams through which those bytes are read:
//!
//! - **`FragmentSource`**: returns the content published at a schema URI, or a
//!   typed [`FetchError`] (e.g. `404 - Not Found`) recorded by the downloader.
//!
//! - **`SchemaLocator`**: resolves a locally stored dependency to the path of
//!   its aggregated document and loads it.
//!
//! `DownloadDirectory` and `DirectorySchemaLocator` are the disk-backed
//! implementations used by the binary. `MemoryFS` implements both traits so
//! that tests can aggregate without touching the file system.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::filesystem::MemoryFS;
use crate::model::ChartDependency;
use crate::schema::AGGREGATED_SCHEMA_FILE;

/// Failure to obtain the content of a fragment.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The schema repository answered with an error status.
    #[error("{status} - {reason}")]
    Status { status: u16, reason: String },

    /// Nothing was downloaded or generated at the expected location.
    #[error("No schema found at {location}")]
    Missing { location: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Error for an HTTP status, with its canonical reason phrase.
    pub fn status(status: u16) -> Self {
        let reason = match status {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            408 => "Request Timeout",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unexpected Status",
        };
        Self::Status {
            status,
            reason: reason.to_string(),
        }
    }
}

/// Path segments mirroring a schema URI: `host[:port]` followed by the
/// non-empty segments of the URI path.
pub fn mirrored_segments(uri: &Url) -> Vec<String> {
    let host = uri.host_str().map(|host| match uri.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    });
    host.into_iter()
        .chain(
            uri.path_segments()
                .into_iter()
                .flatten()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        )
        .collect()
}

fn mirrored_path(uri: &Url) -> PathBuf {
    mirrored_segments(uri).iter().collect()
}

/// Provides the content published at a schema URI.
pub trait FragmentSource: Send + Sync {
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Directory populated by the downloader, one file per schema URI at
/// `<root>/<host[:port]>/<uri path>`.
#[derive(Debug, Clone)]
pub struct DownloadDirectory {
    root: PathBuf,
}

impl DownloadDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, uri: &Url) -> PathBuf {
        self.root.join(mirrored_path(uri))
    }
}

impl FragmentSource for DownloadDirectory {
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(uri);
        if !path.is_file() {
            return Err(FetchError::Missing {
                location: path.display().to_string(),
            });
        }
        Ok(std::fs::read(path)?)
    }
}

impl FragmentSource for MemoryFS {
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError> {
        let path = mirrored_path(uri);
        self.get_file(&path)
            .map(|file| file.content.clone())
            .ok_or_else(|| FetchError::Missing {
                location: path.display().to_string(),
            })
    }
}

/// Locates the aggregated document of locally stored dependencies.
pub trait SchemaLocator: Send + Sync {
    /// Path of the aggregated values schema of `dependency`.
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> PathBuf;

    /// Loads the document at `path`.
    fn load(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        if !path.is_file() {
            return Err(FetchError::Missing {
                location: path.display().to_string(),
            });
        }
        Ok(std::fs::read(path)?)
    }
}

/// Sibling charts laid out as `<root>/<dependency name>[/<sub-path>]/aggregated-values.schema.json`.
#[derive(Debug, Clone)]
pub struct DirectorySchemaLocator {
    root: PathBuf,
    sub_path: Option<PathBuf>,
}

impl DirectorySchemaLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sub_path: None,
        }
    }

    /// Directory, inside each sibling chart, holding its generated documents.
    pub fn with_sub_path(mut self, sub_path: impl Into<PathBuf>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }
}

impl SchemaLocator for DirectorySchemaLocator {
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> PathBuf {
        let mut path = self.root.join(&dependency.name);
        if let Some(sub_path) = &self.sub_path {
            path.push(sub_path);
        }
        path.join(AGGREGATED_SCHEMA_FILE)
    }
}

impl SchemaLocator for MemoryFS {
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> PathBuf {
        Path::new(&dependency.name).join(AGGREGATED_SCHEMA_FILE)
    }

    fn load(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        self.get_file(path)
            .map(|file| file.content.clone())
            .ok_or_else(|| FetchError::Missing {
                location: path.display().to_string(),
            })
    }
}
