//! Atomic write primitive and temporary files
//!
//! Content is written to a uniquely named temp file inside the store root and
//! then renamed over the destination. On unix the rename replaces the target
//! in one step, so readers see either the old or the new file. Other hosts do
//! not promise an atomic replace: there the swap is serialized through a
//! process-wide lock, which keeps writers of this process from interleaving
//! but cannot hide the window from readers in other processes.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, warn};

use crate::constants::{TEMP_FILE_PREFIX, TEMP_FILE_SUFFIX};
use crate::mode::{Data, FileType};
use crate::path::resolve_under;
use crate::{Error, NormalizedPath, Operation, Result};

/// Durability settings for atomic writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Flush file data to disk before the temp file replaces the target.
    pub fsync: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { fsync: true }
    }
}

/// Atomically write `data` to `relative_path` below `root`.
///
/// Returns the absolute path of the written file. On failure the temp file is
/// removed and the destination is left as it was.
///
/// # Errors
///
/// Fails with [`Error::ModeMismatch`] when `data` does not fit `file_type`,
/// [`Error::PathOutsideStore`] when the destination leaves `root`, and with
/// the I/O error of the write or the replace otherwise.
pub fn save_atomic<'a>(
    root: &NormalizedPath,
    relative_path: impl AsRef<Path>,
    data: impl Into<Data<'a>>,
    file_type: FileType,
    options: WriteOptions,
) -> Result<NormalizedPath> {
    let bytes = file_type.encode(data.into())?;
    save_atomic_with(root, relative_path, options, |writer| writer.write_all(&bytes))
}

/// Atomically publish whatever `write` produces at `relative_path` below `root`.
///
/// An error returned by `write` aborts the save; nothing is published and the
/// temp file is removed.
pub fn save_atomic_with<F>(
    root: &NormalizedPath,
    relative_path: impl AsRef<Path>,
    options: WriteOptions,
    write: F,
) -> Result<NormalizedPath>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let dest = resolve_under(root, relative_path.as_ref())?;

    let mut temp = create_temp(root, Operation::Save)?;
    let temp_path = temp.path().to_path_buf();

    if let Err(e) = fill(&mut temp, options, write) {
        warn!(temp = %temp_path.display(), error = %e, "write failed, discarding temp file");
        drop(temp);
        return Err(Error::io(Operation::Save, temp_path, e));
    }

    replace(temp, &dest.to_native()).map_err(|e| {
        warn!(dest = %dest, error = %e, "replace failed, temp file discarded");
        Error::from_io(Operation::Save, dest.to_native(), e)
    })?;

    debug!(path = %dest, "saved file atomically");
    Ok(dest)
}

fn create_temp(root: &NormalizedPath, op: Operation) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(TEMP_FILE_SUFFIX)
        .tempfile_in(root.to_native())
        .map_err(|e| Error::from_io(op, root.to_native(), e))
}

fn fill<F>(temp: &mut NamedTempFile, options: WriteOptions, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let writer: &mut dyn Write = temp;
    write(writer)?;
    temp.flush()?;
    if options.fsync {
        temp.as_file().sync_all()?;
    }
    Ok(())
}

/// Rename `temp` over `dest`. A temp file that could not be persisted is
/// dropped, which deletes it.
#[cfg(unix)]
fn replace(temp: NamedTempFile, dest: &Path) -> std::io::Result<()> {
    temp.persist(dest)
        .map(drop)
        .map_err(|PersistError { error, file }| {
            drop(file);
            error
        })
}

#[cfg(not(unix))]
fn replace(temp: NamedTempFile, dest: &Path) -> std::io::Result<()> {
    use std::sync::{Mutex, PoisonError};

    static REPLACE_LOCK: Mutex<()> = Mutex::new(());

    let _guard = REPLACE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    temp.persist(dest)
        .map(drop)
        .map_err(|PersistError { error, file }| {
            drop(file);
            error
        })
}

/// What happens to a temp file when its handle is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempDisposition {
    DeleteOnClose,
    Keep,
}

#[derive(Debug)]
enum TempHandle {
    Scoped(NamedTempFile),
    Kept { file: File, path: PathBuf },
}

/// A uniquely named file inside the store root.
///
/// Used to build content incrementally before publishing it under its final
/// name with [`TempFile::publish`].
#[derive(Debug)]
pub struct TempFile {
    handle: TempHandle,
    root: NormalizedPath,
}

impl TempFile {
    pub(crate) fn create_in(root: &NormalizedPath, disposition: TempDisposition) -> Result<Self> {
        let temp = create_temp(root, Operation::OpenTemp)?;
        let handle = match disposition {
            TempDisposition::DeleteOnClose => TempHandle::Scoped(temp),
            TempDisposition::Keep => {
                let (file, path) = temp.keep().map_err(|PersistError { error, file }| {
                    Error::io(Operation::OpenTemp, file.path(), error)
                })?;
                TempHandle::Kept { file, path }
            }
        };
        Ok(Self {
            handle,
            root: root.clone(),
        })
    }

    /// Absolute path of the temp file.
    pub fn path(&self) -> &Path {
        match &self.handle {
            TempHandle::Scoped(temp) => temp.path(),
            TempHandle::Kept { path, .. } => path,
        }
    }

    pub fn as_file(&self) -> &File {
        match &self.handle {
            TempHandle::Scoped(temp) => temp.as_file(),
            TempHandle::Kept { file, .. } => file,
        }
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        match &mut self.handle {
            TempHandle::Scoped(temp) => temp.as_file_mut(),
            TempHandle::Kept { file, .. } => file,
        }
    }

    /// Move the temp file to `relative_path`, replacing any existing file.
    pub fn publish(mut self, relative_path: impl AsRef<Path>) -> Result<NormalizedPath> {
        let dest = resolve_under(&self.root, relative_path.as_ref())?;
        self.as_file_mut()
            .flush()
            .map_err(|e| Error::io(Operation::Publish, self.path(), e))?;

        match self.handle {
            TempHandle::Scoped(temp) => replace(temp, &dest.to_native())
                .map_err(|e| Error::from_io(Operation::Publish, dest.to_native(), e))?,
            TempHandle::Kept { file, path } => {
                drop(file);
                fs::rename(&path, dest.to_native())
                    .map_err(|e| Error::from_io(Operation::Publish, dest.to_native(), e))?
            }
        }

        debug!(path = %dest, "published temp file");
        Ok(dest)
    }
}

impl Read for TempFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.as_file_mut().read(buf)
    }
}

impl Write for TempFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.as_file_mut().flush()
    }
}

impl Seek for TempFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.as_file_mut().seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> (tempfile::TempDir, NormalizedPath) {
        let dir = tempfile::tempdir().unwrap();
        let root = NormalizedPath::new(dunce::canonicalize(dir.path()).unwrap());
        (dir, root)
    }

    fn leftovers(root: &NormalizedPath) -> Vec<String> {
        fs::read_dir(root.to_native())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(TEMP_FILE_SUFFIX))
            .collect()
    }

    #[test]
    fn save_atomic_returns_destination() {
        let (_dir, root) = temp_root();
        let written = save_atomic(
            &root,
            "out.txt",
            "payload",
            FileType::default(),
            WriteOptions::default(),
        )
        .unwrap();

        assert_eq!(written, root.join("out.txt"));
        assert_eq!(fs::read_to_string(written.to_native()).unwrap(), "payload");
        assert!(leftovers(&root).is_empty());
    }

    #[test]
    fn failing_writer_leaves_no_temp_and_keeps_destination() {
        let (_dir, root) = temp_root();
        fs::write(root.join("keep.txt").to_native(), "original").unwrap();

        let result = save_atomic_with(&root, "keep.txt", WriteOptions::default(), |w| {
            w.write_all(b"half")?;
            Err(std::io::Error::other("simulated failure"))
        });

        assert!(matches!(result, Err(Error::Io { op: Operation::Save, .. })));
        assert!(leftovers(&root).is_empty());
        assert_eq!(
            fs::read_to_string(root.join("keep.txt").to_native()).unwrap(),
            "original"
        );
    }

    #[test]
    fn mode_mismatch_is_reported_before_touching_disk() {
        let (_dir, root) = temp_root();
        let result = save_atomic(
            &root,
            "bin",
            "text",
            FileType::Binary,
            WriteOptions::default(),
        );
        assert!(matches!(result, Err(Error::ModeMismatch { .. })));
        assert_eq!(fs::read_dir(root.to_native()).unwrap().count(), 0);
    }

    #[test]
    fn scoped_temp_file_is_removed_on_drop() {
        let (_dir, root) = temp_root();
        let temp = TempFile::create_in(&root, TempDisposition::DeleteOnClose).unwrap();
        let path = temp.path().to_path_buf();
        assert!(path.exists());
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn kept_temp_file_survives_drop() {
        let (_dir, root) = temp_root();
        let mut temp = TempFile::create_in(&root, TempDisposition::Keep).unwrap();
        temp.write_all(b"kept").unwrap();
        let path = temp.path().to_path_buf();
        drop(temp);
        assert_eq!(fs::read(&path).unwrap(), b"kept");
    }

    #[test]
    fn published_temp_file_lands_at_destination() {
        let (_dir, root) = temp_root();
        let mut temp = TempFile::create_in(&root, TempDisposition::DeleteOnClose).unwrap();
        temp.write_all(b"line one\n").unwrap();
        temp.write_all(b"line two\n").unwrap();

        let dest = temp.publish("final.log").unwrap();
        assert_eq!(
            fs::read_to_string(dest.to_native()).unwrap(),
            "line one\nline two\n"
        );
        assert!(leftovers(&root).is_empty());
    }
}
