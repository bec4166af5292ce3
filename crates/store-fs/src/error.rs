//! Error types for store-fs

use std::fmt;
use std::path::PathBuf;

use crate::name::NameViolation;

/// Result type for store-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Filesystem operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateRoot,
    Save,
    Load,
    Open,
    OpenTemp,
    Publish,
    Delete,
    DeleteFolder,
    List,
    CreateFolder,
    LinkHard,
    Rename,
    ReadConfig,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRoot => "create root",
            Self::Save => "save",
            Self::Load => "load",
            Self::Open => "open",
            Self::OpenTemp => "open temp",
            Self::Publish => "publish",
            Self::Delete => "delete",
            Self::DeleteFolder => "delete folder",
            Self::List => "list",
            Self::CreateFolder => "create folder",
            Self::LinkHard => "hard link",
            Self::Rename => "rename",
            Self::ReadConfig => "read config",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in store-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path {path} is outside of store root {root}")]
    PathOutsideStore { path: PathBuf, root: PathBuf },

    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Not a file: {path}")]
    NotAFile { path: PathBuf },

    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Invalid file name component {name:?}: {reason}")]
    InvalidName { name: String, reason: NameViolation },

    #[error("Store is in {expected} mode but received {found} data")]
    ModeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Content of {path} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("I/O error during {op} at {path}: {source}")]
    Io {
        op: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error without classifying it.
    pub fn io(op: Operation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Map an I/O error onto the typed variants where the kind has one.
    pub fn from_io(op: Operation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { op, path, source },
        }
    }

    /// Whether this is a missing-entry error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
