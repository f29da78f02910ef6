//! # Error Handling
//!
//! This module defines the centralized error type for `helm-values`. It uses
//! the `thiserror` library to derive one `Error` enum covering every failure
//! the library can report, with contextual fields and optional hints.
//!
//! ## Fatal and isolated failures
//!
//! Aggregation is deliberately forgiving: a fragment that cannot be fetched or
//! parsed, a reference that cannot be resolved, or a patch that does not apply
//! are logged and degrade into inline markers inside the produced document.
//! Only two variants ever escape [`crate::aggregate::Aggregator::aggregate`]:
//!
//! - [`Error::MissingBaseDocument`]
//! - [`Error::MissingPackageMetadata`]
//!
//! The remaining variants are used by the loading helpers (`config`, `patch`,
//! `filesystem`, `source`) and internally by the aggregation stages, where
//! they are turned into log lines or `$error` markers.

use thiserror::Error;

use crate::source::FetchError;

/// Main error type for helm-values operations
#[derive(Error, Debug)]
pub enum Error {
    /// The `.helm-values.yaml` configuration could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// No usable base document was supplied to aggregation.
    #[error("Missing base schema document: {message}")]
    MissingBaseDocument { message: String },

    /// Chart metadata is absent or unusable.
    #[error("Missing chart metadata: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    MissingPackageMetadata {
        message: String,
        /// Optional hint, typically pointing at the expected `Chart.yaml`
        hint: Option<String>,
    },

    /// A schema fragment is not a well-formed JSON schema document.
    #[error("Invalid JSON schema {location}: {message}")]
    Schema { location: String, message: String },

    /// A pointer could not be followed or created inside a document.
    #[error("Pointer error at {pointer}: {message}")]
    Pointer { pointer: String, message: String },

    /// A patch could not be read or applied.
    #[error("Patch error ({stage}): {message}")]
    Patch { stage: String, message: String },

    /// A path-related operation failed.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// A fragment could not be obtained from its source.
    ///
    /// Rendered without prefix so that the text can be used verbatim as an
    /// `$error` marker (e.g. `404 - Not Found`).
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
