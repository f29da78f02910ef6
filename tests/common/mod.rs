//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_chart("app", charts::WITH_DEPENDENCIES);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use helm_values::filesystem::MemoryFS;
use serde_json::Value;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::charts;
    #[allow(unused_imports)]
    pub use super::memory_fs;
    pub use super::TestFixture;
}

/// Common `Chart.yaml` and `.helm-values.yaml` snippets for testing.
#[allow(dead_code)]
pub mod charts {
    /// Chart with one remote and one sibling dependency.
    pub const WITH_DEPENDENCIES: &str = r#"
apiVersion: v2
name: app
version: 1.0.0
dependencies:
  - name: db
    version: 1.0.0
    repository: "@charts"
  - name: lib
    version: 0.1.0
    repository: file://../lib
"#;

    /// Chart without dependencies.
    pub const MINIMAL: &str = r#"
apiVersion: v2
name: app
version: 1.0.0
"#;

    /// Configuration mapping `@charts` to a schema repository.
    pub const CONFIG: &str = r#"
repositories:
  "@charts":
    base-uri: https://charts.example.com
"#;

    /// Configuration with an unknown key.
    pub const INVALID_CONFIG: &str = r#"
repositories:
  "@charts":
    url: https://charts.example.com
"#;
}

/// In-memory file tree holding the JSON documents of `files`.
#[allow(dead_code)]
pub fn memory_fs(files: &[(&str, Value)]) -> MemoryFS {
    let mut fs = MemoryFS::new();
    for (path, content) in files {
        fs.add_file_string(path, &content.to_string());
    }
    fs
}

/// A test fixture that provides a temporary directory holding charts.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_chart("app", charts::MINIMAL)
///     .with_file("app/values.schema.json", "{}");
///
/// fixture.command().arg("aggregate").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add `<dir>/Chart.yaml` with the given content.
    pub fn with_chart(self, dir: &str, content: &str) -> Self {
        self.with_file(&format!("{}/Chart.yaml", dir), content)
    }

    /// Add `<dir>/.helm-values.yaml` with the given content.
    pub fn with_config(self, dir: &str, content: &str) -> Self {
        self.with_file(&format!("{}/.helm-values.yaml", dir), content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a JSON document with the given path.
    pub fn with_json(self, path: &str, content: Value) -> Self {
        self.with_file(path, &content.to_string())
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Reads and parses a JSON document of the fixture.
    #[allow(dead_code)]
    pub fn read_json(&self, path: &str) -> Value {
        let content =
            std::fs::read_to_string(self.path().join(path)).expect("Failed to read document");
        serde_json::from_str(&content).expect("Document should be valid JSON")
    }

    /// Create a command configured to run in this fixture's directory, with
    /// plain-text output.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("helm-values");
        cmd.current_dir(self.path())
            .arg("--color")
            .arg("never")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_chart() {
        let fixture = TestFixture::new().with_chart("app", charts::MINIMAL);
        assert!(fixture.path().join("app/Chart.yaml").exists());
    }

    #[test]
    fn test_charts_are_valid_yaml() {
        for content in [charts::WITH_DEPENDENCIES, charts::MINIMAL, charts::CONFIG] {
            serde_yaml::from_str::<serde_yaml::Value>(content).expect("Snippet should be valid YAML");
        }
    }
}
