//! Root-confined local file store

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::io::{self, TempDisposition, TempFile, WriteOptions};
use crate::mode::{Content, Data, FileType};
use crate::path::{checked_str, relative_to_root, resolve_under};
use crate::{Error, NormalizedPath, Operation, Result, StoreConfig};

/// How [`LocalFileStore::open_file`] opens a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read an existing file.
    Read,
    /// Create or truncate for writing.
    Write,
    /// Create if missing and append.
    Append,
    /// Create for writing, failing if the file exists.
    CreateNew,
}

impl OpenMode {
    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::Write => options.write(true).create(true).truncate(true),
            Self::Append => options.append(true).create(true),
            Self::CreateNew => options.write(true).create_new(true),
        };
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

/// A directory on the local filesystem that all operations stay inside.
///
/// Paths handed to the store are either relative to its root or absolute
/// paths below it. Anything that would land outside the root is refused
/// with [`Error::PathOutsideStore`]. The store keeps no state besides its
/// root and content settings, so it can be cloned and shared across threads
/// freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileStore {
    root: NormalizedPath,
    file_type: FileType,
    write_options: WriteOptions,
}

impl LocalFileStore {
    /// Open a store rooted at `root`.
    ///
    /// The root is made absolute and, when it exists, canonicalized. With
    /// `create_if_missing` the directory tree is created first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for an empty path, one containing NUL or
    /// one that is not valid UTF-8, and an I/O error if the root cannot be created.
    pub fn new(root: impl AsRef<Path>, file_type: FileType, create_if_missing: bool) -> Result<Self> {
        let raw = root.as_ref();
        let raw_str = checked_str(raw)?;
        if raw_str.is_empty() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "store root is empty".into(),
            });
        }

        let absolute = std::path::absolute(raw).map_err(|e| Error::InvalidPath {
            path: raw_str.to_string(),
            reason: e.to_string(),
        })?;

        if create_if_missing {
            fs::create_dir_all(&absolute)
                .map_err(|e| Error::io(Operation::CreateRoot, &absolute, e))?;
        }

        let root = match dunce::canonicalize(&absolute) {
            Ok(real) => NormalizedPath::new(real),
            Err(_) => NormalizedPath::new(&absolute),
        };
        debug!(root = %root, file_type = file_type.name(), "opened file store");

        Ok(Self {
            root,
            file_type,
            write_options: WriteOptions::default(),
        })
    }

    /// Open a store from a loaded configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(&config.root, config.file_type(), config.create_if_missing)?
            .with_write_options(config.write_options()))
    }

    pub fn with_write_options(mut self, write_options: WriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    /// The normalized absolute root.
    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// The root as a string terminated by a separator.
    pub fn storage_path(&self) -> String {
        self.root.dir_prefix()
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn write_options(&self) -> WriteOptions {
        self.write_options
    }

    /// Resolve a root-relative or absolute path to an absolute path inside
    /// the store.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<NormalizedPath> {
        resolve_under(&self.root, path.as_ref())
    }

    /// Atomically write `data` to `relative_path`, replacing any existing file.
    pub fn save<'a>(
        &self,
        relative_path: impl AsRef<Path>,
        data: impl Into<Data<'a>>,
    ) -> Result<NormalizedPath> {
        io::save_atomic(
            &self.root,
            relative_path,
            data,
            self.file_type,
            self.write_options,
        )
    }

    /// Atomically publish what `write` produces at `relative_path`.
    pub fn save_with<F>(&self, relative_path: impl AsRef<Path>, write: F) -> Result<NormalizedPath>
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        io::save_atomic_with(&self.root, relative_path, self.write_options, write)
    }

    /// Read a whole file, decoded according to the store's file type.
    pub fn load(&self, relative_path: impl AsRef<Path>) -> Result<Content> {
        let (path, bytes) = self.read_bytes(relative_path.as_ref())?;
        self.file_type.decode(&path, bytes)
    }

    /// Read a whole file as text. Only valid for text-mode stores.
    pub fn load_text(&self, relative_path: impl AsRef<Path>) -> Result<String> {
        match self.load(relative_path)? {
            Content::Text(text) => Ok(text),
            Content::Bytes(_) => Err(Error::ModeMismatch {
                expected: "binary",
                found: "text request",
            }),
        }
    }

    /// Read a whole file as raw bytes, whatever the store's file type.
    pub fn load_bytes(&self, relative_path: impl AsRef<Path>) -> Result<Vec<u8>> {
        self.read_bytes(relative_path.as_ref()).map(|(_, bytes)| bytes)
    }

    fn read_bytes(&self, relative_path: &Path) -> Result<(PathBuf, Vec<u8>)> {
        let path = self.resolve(relative_path)?.to_native();
        if path.is_dir() {
            return Err(Error::NotAFile { path });
        }
        let bytes = fs::read(&path).map_err(|e| Error::from_io(Operation::Load, &path, e))?;
        Ok((path, bytes))
    }

    /// Open a file inside the store. The handle closes when dropped.
    pub fn open_file(&self, relative_path: impl AsRef<Path>, mode: OpenMode) -> Result<File> {
        let path = self.resolve(relative_path)?.to_native();
        mode.options()
            .open(&path)
            .map_err(|e| Error::from_io(Operation::Open, &path, e))
    }

    /// Create a uniquely named file in the store root.
    pub fn open_temp(&self, disposition: TempDisposition) -> Result<TempFile> {
        TempFile::create_in(&self.root, disposition)
    }

    /// Remove a regular file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the target is missing or is not a
    /// regular file.
    pub fn delete(&self, relative_path: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(relative_path)?.to_native();
        if !path.is_file() {
            return Err(Error::NotFound { path });
        }
        fs::remove_file(&path).map_err(|e| Error::from_io(Operation::Delete, &path, e))?;
        debug!(path = %path.display(), "deleted file");
        Ok(())
    }

    /// Remove a directory, optionally with everything below it.
    ///
    /// Without `recursive` the directory must already be empty; the OS error
    /// is returned otherwise. The store root itself cannot be removed.
    pub fn delete_folder(&self, relative_path: impl AsRef<Path>, recursive: bool) -> Result<()> {
        let resolved = self.resolve(relative_path)?;
        let path = resolved.to_native();
        if !path.is_dir() {
            return Err(Error::NotADirectory { path });
        }
        if resolved == self.root {
            return Err(Error::InvalidPath {
                path: resolved.to_string(),
                reason: "refusing to delete the store root".into(),
            });
        }
        let removed = if recursive {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_dir(&path)
        };
        removed.map_err(|e| Error::io(Operation::DeleteFolder, &path, e))?;
        debug!(path = %path.display(), recursive, "deleted folder");
        Ok(())
    }

    /// List the regular files directly inside `relative_path`.
    ///
    /// With `relative_to_root` the entries are root-relative paths, otherwise
    /// bare names. Order follows the filesystem and is not sorted.
    /// Entries whose names are not valid UTF-8 are skipped with a warning.
    pub fn list_files(
        &self,
        relative_path: impl AsRef<Path>,
        relative_to_root: bool,
    ) -> Result<Vec<String>> {
        self.list(relative_path.as_ref(), relative_to_root, EntryKind::File)
    }

    /// List the directories directly inside `relative_path`.
    pub fn list_dirs(
        &self,
        relative_path: impl AsRef<Path>,
        relative_to_root: bool,
    ) -> Result<Vec<String>> {
        self.list(relative_path.as_ref(), relative_to_root, EntryKind::Dir)
    }

    fn list(&self, relative_path: &Path, relative_to_root: bool, kind: EntryKind) -> Result<Vec<String>> {
        let resolved = self.resolve(relative_path)?;
        let scan_path = resolved.to_native();
        if scan_path.exists() && !scan_path.is_dir() {
            return Err(Error::NotADirectory { path: scan_path });
        }
        let base = self.to_relative(&resolved)?;

        let entries =
            fs::read_dir(&scan_path).map_err(|e| Error::from_io(Operation::List, &scan_path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(Operation::List, &scan_path, e))?;
            if entry_kind(&entry.path()) != Some(kind) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                warn!(path = %entry.path().display(), "skipping entry with a non UTF-8 name");
                continue;
            };
            if relative_to_root {
                names.push(base.join(&name).as_str().to_string());
            } else {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Whether a regular file exists at `relative_path`.
    pub fn has_file(&self, relative_path: impl AsRef<Path>) -> Result<bool> {
        Ok(self.resolve(relative_path)?.is_file())
    }

    /// Whether a directory exists at `relative_path`.
    pub fn has_folder(&self, relative_path: impl AsRef<Path>) -> Result<bool> {
        Ok(self.resolve(relative_path)?.is_dir())
    }

    /// Create a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the directory is present and
    /// `exists_ok` is false, or if something other than a directory occupies
    /// the path.
    pub fn create_folder(&self, relative_path: impl AsRef<Path>, exists_ok: bool) -> Result<()> {
        let path = self.resolve(relative_path)?.to_native();
        if path.is_dir() {
            return if exists_ok {
                Ok(())
            } else {
                Err(Error::AlreadyExists { path })
            };
        }
        fs::create_dir_all(&path).map_err(|e| Error::from_io(Operation::CreateFolder, &path, e))?;
        debug!(path = %path.display(), "created folder");
        Ok(())
    }

    /// Create a hard link at `to` pointing at the file at `from`.
    pub fn link_hard(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        let from = self.resolve(from)?.to_native();
        let to = self.resolve(to)?.to_native();
        fs::hard_link(&from, &to).map_err(|e| pair_error(Operation::LinkHard, &from, &to, e))?;
        debug!(from = %from.display(), to = %to.display(), "linked file");
        Ok(())
    }

    /// Rename `from` to `to` inside the store.
    ///
    /// Atomic when both paths are on the same filesystem of a unix host.
    pub fn atomic_rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        let from = self.resolve(from)?.to_native();
        let to = self.resolve(to)?.to_native();
        fs::rename(&from, &to).map_err(|e| pair_error(Operation::Rename, &from, &to, e))?;
        debug!(from = %from.display(), to = %to.display(), "renamed");
        Ok(())
    }

    /// Whether the absolute `path` is the root or lies below it.
    ///
    /// Symlinks in the parent chain are resolved first. Relative and
    /// malformed paths are never in the store.
    pub fn in_store(&self, path: impl AsRef<Path>) -> bool {
        checked_str(path.as_ref())
            .is_ok_and(|s| relative_to_root(&self.root, &NormalizedPath::new(s)).is_some())
    }

    /// Express the absolute `path` relative to the root. The root itself maps
    /// to the empty path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for malformed input and
    /// [`Error::PathOutsideStore`] when [`in_store`](Self::in_store) is false.
    pub fn to_relative(&self, path: impl AsRef<Path>) -> Result<NormalizedPath> {
        let path = path.as_ref();
        let normalized = NormalizedPath::new(checked_str(path)?);
        relative_to_root(&self.root, &normalized).ok_or_else(|| Error::PathOutsideStore {
            path: path.to_path_buf(),
            root: self.root.to_native(),
        })
    }
}

fn entry_kind(path: &Path) -> Option<EntryKind> {
    // follows symlinks, a dangling link is neither
    let metadata = fs::metadata(path).ok()?;
    if metadata.is_file() {
        Some(EntryKind::File)
    } else if metadata.is_dir() {
        Some(EntryKind::Dir)
    } else {
        None
    }
}

/// Blame a missing entry on the source and anything else on the target.
fn pair_error(op: Operation, from: &Path, to: &Path, source: std::io::Error) -> Error {
    match source.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            path: from.to_path_buf(),
        },
        _ => Error::from_io(op, to, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), FileType::default(), false).unwrap();
        (dir, store)
    }

    #[test]
    fn storage_path_ends_with_separator() {
        let (_dir, store) = store();
        assert!(store.storage_path().ends_with('/'));
        assert_eq!(store.storage_path(), store.root().dir_prefix());
    }

    #[test]
    fn new_rejects_empty_root() {
        let result = LocalFileStore::new("", FileType::default(), false);
        assert!(matches!(result, Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn new_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LocalFileStore::new(&nested, FileType::Binary, true).unwrap();
        assert!(nested.is_dir());
        assert!(store.root().is_dir());

        // idempotent
        LocalFileStore::new(&nested, FileType::Binary, true).unwrap();
    }

    #[test]
    fn relative_parent_escape_is_refused() {
        let (_dir, store) = store();
        assert!(matches!(
            store.resolve("../outside.txt"),
            Err(Error::PathOutsideStore { .. })
        ));
        assert!(matches!(
            store.resolve("a/../../outside.txt"),
            Err(Error::PathOutsideStore { .. })
        ));
        assert_eq!(
            store.resolve("a/../inside.txt").unwrap(),
            store.root().join("inside.txt")
        );
    }

    #[test]
    fn root_relativizes_to_empty_path() {
        let (_dir, store) = store();
        assert!(store.to_relative(store.root()).unwrap().is_empty());
        assert_eq!(store.resolve("").unwrap(), *store.root());
    }

    #[test]
    fn delete_folder_refuses_root() {
        let (_dir, store) = store();
        assert!(matches!(
            store.delete_folder("", true),
            Err(Error::InvalidPath { .. })
        ));
        assert!(store.root().is_dir());
    }

    #[test]
    fn load_text_on_binary_store_is_a_mode_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), FileType::Binary, false).unwrap();
        store.save("blob", b"\x00\x01").unwrap();
        assert!(matches!(
            store.load_text("blob"),
            Err(Error::ModeMismatch { .. })
        ));
        assert_eq!(store.load_bytes("blob").unwrap(), vec![0u8, 1]);
    }
}
