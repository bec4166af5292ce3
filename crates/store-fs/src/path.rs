//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Normalization is purely lexical: backslashes become forward slashes,
/// empty and `.` segments are dropped and `..` pops the previous segment.
/// On absolute paths `..` never climbs above the filesystem root. On relative
/// paths a `..` with nothing left to pop is kept, so [`escapes`](Self::escapes)
/// can tell that the path points above its base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Non-UTF-8 bytes are replaced with U+FFFD; the store validates its
    /// inputs before they get here.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment and normalize the result.
    ///
    /// The segment is always appended, even when it looks absolute.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        if segment_normalized.is_empty() {
            return self.clone();
        }
        let joined = if self.inner.is_empty() {
            segment_normalized
        } else if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let prefix = prefix_len(&self.inner);
        let rest = &self.inner[prefix..];
        if rest.is_empty() {
            return None;
        }
        match rest.rfind('/') {
            Some(idx) => Some(Self {
                inner: self.inner[..prefix + idx].to_string(),
            }),
            None if prefix > 0 => Some(Self {
                inner: self.inner[..prefix].to_string(),
            }),
            None => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let rest = &self.inner[prefix_len(&self.inner)..];
        if rest.is_empty() {
            return None;
        }
        rest.rsplit('/').next()
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }

    /// Whether the path starts at a filesystem root (`/`, `//`, or a drive).
    pub fn is_absolute(&self) -> bool {
        prefix_len(&self.inner) > 0
    }

    /// Whether the path is empty (a relative path to the base itself).
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Whether a relative path climbs above its base.
    pub fn escapes(&self) -> bool {
        !self.is_absolute() && (self.inner == ".." || self.inner.starts_with("../"))
    }

    /// Iterate over the segments after the root prefix.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner[prefix_len(&self.inner)..]
            .split('/')
            .filter(|s| !s.is_empty())
    }

    /// Whether `base` is this path or one of its ancestors, segment-wise.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        self.strip_prefix(base).is_some()
    }

    /// Return the remainder of this path below `base`.
    ///
    /// Matching is done on whole segments, so `/data-old` is not below `/data`.
    pub fn strip_prefix(&self, base: &NormalizedPath) -> Option<NormalizedPath> {
        if self.inner == base.inner {
            return Some(Self {
                inner: String::new(),
            });
        }
        let dir = base.dir_prefix();
        self.inner.strip_prefix(dir.as_str()).map(|rest| Self {
            inner: rest.to_string(),
        })
    }

    /// The path as a directory prefix, always ending in `/`.
    pub fn dir_prefix(&self) -> String {
        if self.inner.is_empty() || self.inner.ends_with('/') {
            self.inner.clone()
        } else {
            format!("{}/", self.inner)
        }
    }

    /// Resolve symlinks in the existing part of the parent chain.
    ///
    /// The deepest ancestor of the parent directory that exists is
    /// canonicalized and the remaining segments, including the file name,
    /// are re-appended unchanged. The final segment is never followed, so a
    /// symlink at the leaf keeps its own name.
    pub fn canonicalize_parent(&self) -> Option<Self> {
        let mut tail = vec![self.file_name()?.to_string()];
        let mut base = self.parent()?;
        loop {
            if let Ok(real) = dunce::canonicalize(base.to_native()) {
                let mut resolved = NormalizedPath::new(real);
                for segment in tail.iter().rev() {
                    resolved = resolved.join(segment);
                }
                return Some(resolved);
            }
            tail.push(base.file_name()?.to_string());
            base = base.parent()?;
        }
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    /// Check if this appears to be a network path.
    ///
    /// Detects UNC paths (//server/share or \\server\share).
    pub fn is_network_path(&self) -> bool {
        self.inner.starts_with("//")
    }
}

/// Length of the root prefix: `//` for UNC, `X:/` for drives, `/` otherwise.
fn prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if s.starts_with("//") {
        2
    } else if s.starts_with('/') {
        1
    } else if is_drive(bytes) {
        3
    } else {
        0
    }
}

/// `X:/` at the start of a path.
fn is_drive(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

fn clean(s: &str) -> String {
    let bytes = s.as_bytes();
    // `///x` is a plain absolute path, only exactly two slashes mark UNC
    let prefix = if s.starts_with("//") && !s.starts_with("///") {
        "//".to_string()
    } else if s.starts_with('/') {
        "/".to_string()
    } else if is_drive(bytes) {
        s[..3].to_string()
    } else {
        String::new()
    };
    let absolute = !prefix.is_empty();

    let body = if absolute { &s[prefix.len()..] } else { s };

    let mut stack: Vec<&str> = Vec::new();
    for segment in body.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    format!("{}{}", prefix, stack.join("/"))
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<&NormalizedPath> for NormalizedPath {
    fn from(p: &NormalizedPath) -> Self {
        p.clone()
    }
}

/// Map an absolute `path` onto a path relative to `root`.
///
/// The path must lie below `root` once symlinks in its parent chain are
/// resolved, whatever it looks like lexically. The lexical remainder is
/// returned when it is also below `root`, so links that stay inside the store
/// keep their names. Relative paths are never inside.
pub(crate) fn relative_to_root(
    root: &NormalizedPath,
    path: &NormalizedPath,
) -> Option<NormalizedPath> {
    if !path.is_absolute() {
        return None;
    }
    let real_root = root.canonicalize_parent().unwrap_or_else(|| root.clone());
    let real = path.canonicalize_parent().unwrap_or_else(|| path.clone());
    let real_relative = real.strip_prefix(&real_root)?;
    Some(path.strip_prefix(root).unwrap_or(real_relative))
}

/// Borrow `raw` as UTF-8, refusing NUL bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for input that is not valid UTF-8 or that
/// contains NUL.
pub(crate) fn checked_str(raw: &Path) -> Result<&str> {
    let Some(s) = raw.to_str() else {
        return Err(Error::InvalidPath {
            path: raw.to_string_lossy().into_owned(),
            reason: "path is not valid UTF-8".into(),
        });
    };
    if s.contains('\0') {
        return Err(Error::InvalidPath {
            path: s.to_string(),
            reason: "path contains a NUL byte".into(),
        });
    }
    Ok(s)
}

/// Resolve `raw` to an absolute path confined to `root`.
///
/// Relative input is joined onto `root` and must not climb above it.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for malformed input and
/// [`Error::PathOutsideStore`] when the path cannot be mapped below `root`.
pub(crate) fn resolve_under(root: &NormalizedPath, raw: &Path) -> Result<NormalizedPath> {
    let path = NormalizedPath::new(checked_str(raw)?);
    let absolute = if path.is_absolute() {
        Some(path)
    } else if path.escapes() {
        None
    } else {
        Some(root.join(path.as_str()))
    };
    match absolute.and_then(|absolute| relative_to_root(root, &absolute)) {
        Some(relative) => Ok(root.join(relative.as_str())),
        None => Err(Error::PathOutsideStore {
            path: raw.to_path_buf(),
            root: root.to_native(),
        }),
    }
}
