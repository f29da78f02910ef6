//! In-memory snapshot of a directory tree
//!
//! Aggregation never walks the live file system: the extraction root (and,
//! in tests, any other input tree) is first loaded into a [`MemoryFS`]. Paths
//! are stored relative to the snapshot root and kept sorted, so directory
//! listings come back in the same order on every run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Represents a file with content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Read-only snapshot of a directory tree, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots every file below `root`.
    ///
    /// Files are listed with `walkdir` and read in parallel. A missing root
    /// yields an empty snapshot: nothing was extracted.
    pub fn load_from_disk(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Ok(Self::new());
        }
        let paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        let files: Vec<(PathBuf, File)> = paths
            .par_iter()
            .map(|path| -> Result<(PathBuf, File)> {
                let relative = path.strip_prefix(root).map_err(|_| Error::Path {
                    message: format!("Failed to make path relative: {}", path.display()),
                })?;
                let content = std::fs::read(path)?;
                Ok((relative.to_path_buf(), File::new(content)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            files: files.into_iter().collect(),
        })
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) {
        self.files.insert(path.as_ref().to_path_buf(), file);
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) {
        self.add_file(path, File::from_string(content));
    }

    /// Get a file by path
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(path.as_ref())
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// Check if `dir` directly contains a file named `file_name`
    pub fn contains_file<P: AsRef<Path>>(&self, dir: P, file_name: &str) -> bool {
        self.exists(dir.as_ref().join(file_name))
    }

    /// Names of the immediate subdirectories of `dir`, sorted.
    ///
    /// Directories only exist through the files they hold: an empty
    /// directory is not part of a snapshot.
    pub fn subdirectories<P: AsRef<Path>>(&self, dir: P) -> Vec<String> {
        let dir = dir.as_ref();
        let names: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(dir).ok())
            .filter_map(|rest| {
                let mut components = rest.components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(name)), Some(_)) => {
                        Some(name.to_string_lossy().into_owned())
                    }
                    _ => None,
                }
            })
            .collect();
        names.into_iter().collect()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, file) pairs, in path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted_tree() -> MemoryFS {
        let mut fs = MemoryFS::new();
        fs.add_file_string("b/values.schema.json", "{}");
        fs.add_file_string("a/values.schema.json", "{}");
        fs.add_file_string("a/nested/deeper/values.schema.json", "{}");
        fs.add_file_string("a/README.md", "docs");
        fs
    }

    #[test]
    fn test_subdirectories_are_sorted() {
        let fs = extracted_tree();
        assert_eq!(fs.subdirectories(""), vec!["a", "b"]);
        assert_eq!(fs.subdirectories("a"), vec!["nested"]);
        assert_eq!(fs.subdirectories("a/nested"), vec!["deeper"]);
        assert!(fs.subdirectories("b").is_empty());
        assert!(fs.subdirectories("missing").is_empty());
    }

    #[test]
    fn test_contains_file() {
        let fs = extracted_tree();
        assert!(fs.contains_file("a", "values.schema.json"));
        assert!(!fs.contains_file("a/nested", "values.schema.json"));
        assert!(fs.contains_file("a/nested/deeper", "values.schema.json"));
    }

    #[test]
    fn test_add_file_overwrites() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("x.json", "1");
        fs.add_file_string("x.json", "22");
        assert_eq!(fs.len(), 1);
        assert_eq!(fs.get_file("x.json").unwrap().size(), 2);
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("a/values.schema.json"), "{\"a\":1}").unwrap();
        std::fs::write(nested.join("values.schema.json"), "{}").unwrap();

        let fs = MemoryFS::load_from_disk(temp.path()).unwrap();
        assert_eq!(fs.len(), 2);
        assert_eq!(
            fs.get_file("a/values.schema.json").unwrap().content,
            b"{\"a\":1}".to_vec()
        );
        assert_eq!(fs.subdirectories("a"), vec!["b"]);
    }

    #[test]
    fn test_load_from_missing_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let fs = MemoryFS::load_from_disk(&temp.path().join("absent")).unwrap();
        assert!(fs.is_empty());
    }
}
