//! [`TestStore`] builder for store test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use store_fs::{FileType, LocalFileStore};
use tempfile::TempDir;

/// A temporary directory with a [`LocalFileStore`] rooted in it.
///
/// # Example
///
/// ```rust,no_run
/// use store_test_utils::store::TestStore;
///
/// let test = TestStore::new();
/// test.with_file("a/report.txt", "hello");
/// test.assert_file_contains("a/report.txt", "hello");
/// ```
pub struct TestStore {
    temp_dir: TempDir,
    store: LocalFileStore,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    /// A text-mode store over a fresh empty directory.
    pub fn new() -> Self {
        Self::with_file_type(FileType::default())
    }

    /// A store of the given file type over a fresh empty directory.
    pub fn with_file_type(file_type: FileType) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path(), file_type, false)
            .unwrap_or_else(|e| panic!("TestStore: failed to open store: {e}"));
        Self { temp_dir, store }
    }

    pub fn store(&self) -> &LocalFileStore {
        &self.store
    }

    /// The store root as a native path.
    pub fn root(&self) -> PathBuf {
        self.store.root().to_native()
    }

    /// The temporary directory as created, before canonicalization.
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file directly, creating parents, bypassing the store.
    pub fn with_file(&self, path: &str, content: impl AsRef<[u8]>) -> &Self {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("TestStore: failed to write {}: {e}", full_path.display()));
        self
    }

    /// Create a directory directly, bypassing the store.
    pub fn with_dir(&self, path: &str) -> &Self {
        fs::create_dir_all(self.root().join(path)).unwrap();
        self
    }

    /// Names of all entries directly inside `path`, sorted.
    pub fn entries(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root().join(path))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Names of leftover temp files in the root.
    pub fn temp_leftovers(&self) -> Vec<String> {
        self.entries("")
            .into_iter()
            .filter(|name| {
                name.starts_with(store_fs::constants::TEMP_FILE_PREFIX)
                    && name.ends_with(store_fs::constants::TEMP_FILE_SUFFIX)
            })
            .collect()
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }
}
