//! Root-confined local file store
//!
//! [`LocalFileStore`] manages a directory on the local filesystem: atomic
//! saves, reads, deletes, enumeration, links and renames, all confined to the
//! store root. [`save_atomic`] is also usable without a store instance.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod logging;
pub mod mode;
pub mod name;
pub mod path;
pub mod store;

pub use config::{ContentMode, StoreConfig};
pub use error::{Error, Operation, Result};
pub use io::{TempDisposition, TempFile, WriteOptions, save_atomic, save_atomic_with};
pub use mode::{Content, Data, FileType, TextEncoding};
pub use name::{NameViolation, file_name_from_path, validate_file_name_component};
pub use path::NormalizedPath;
pub use store::{LocalFileStore, OpenMode};
